use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use upf_faqs::{SearchConfig, SearchFaq, SearchOverlay, highlight, match_candidates};

const TOPICS: &[&str] = &[
    "sugar", "seed oils", "emulsifiers", "bread", "yogurt", "cereal", "protein bars",
    "sweeteners", "frozen meals", "plant milk",
];

/// A catalogue shaped like the live dataset: a few hundred questions, most
/// with a one-line summary, a handful malformed.
fn catalogue(size: usize) -> Vec<SearchFaq> {
    (0..size)
        .map(|idx| {
            let topic = TOPICS[idx % TOPICS.len()];
            let question = format!("Is {topic} ultra-processed? (variant {idx})");
            let summary = format!("Short answer about {topic} and how it is made.");
            let mut faq = SearchFaq::new(
                format!("faq-{idx}"),
                question,
                format!("faq-{idx}"),
                (idx % 4 != 0).then_some(summary.as_str()),
            );
            if idx % 50 == 0 {
                faq.slug = None;
            }
            faq
        })
        .collect()
}

fn bench_match_candidates(c: &mut Criterion) {
    let config = SearchConfig::default();
    for size in [100usize, 1_000] {
        let faqs = catalogue(size);
        for query in ["su", "seed oils", "nothing matches this"] {
            c.bench_with_input(
                BenchmarkId::new(format!("match_candidates/{size}"), query),
                &query,
                |b, &query| {
                    b.iter(|| black_box(match_candidates(&faqs, query, &config).len()));
                },
            );
        }
    }
}

fn bench_highlight(c: &mut Criterion) {
    let text = "Sugar, sugar syrups and sugar alcohols are common in ultra-processed sugar snacks.";
    for term in ["sugar", "ultra-processed", "zz"] {
        c.bench_with_input(BenchmarkId::new("highlight", term), &term, |b, &term| {
            b.iter(|| black_box(highlight(text, term).len()));
        });
    }
}

fn bench_overlay_typing(c: &mut Criterion) {
    let faqs = catalogue(500);
    c.bench_function("overlay::type_query", |b| {
        b.iter(|| {
            let mut overlay = SearchOverlay::new(faqs.clone(), SearchConfig::default());
            overlay.focus();
            for prefix in ["s", "se", "see", "seed", "seed o", "seed oils"] {
                overlay.input(prefix);
                black_box(overlay.view().results.len());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_match_candidates,
    bench_highlight,
    bench_overlay_typing
);
criterion_main!(benches);
