use std::error::Error;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use termimad::crossterm::style::Stylize;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::runtime::Runtime;
use tracing::info;
use upf_faqs::links::{author_path, display_tag, faq_path, tag_slug};
use upf_faqs::model::{Faq, tag_label};
use upf_faqs::portable_text::to_markdown;
use upf_faqs::{
    ContentSource, ImageUrlBuilder, OverlayState, OverlayView, SanityConfig, SearchConfig,
    SearchOverlay, Segment, schema,
};

#[derive(Parser, Debug)]
#[command(name = "upf-faqs", about = "Search and inspect UPF FAQs content", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Read content from a JSON snapshot instead of the Sanity API.
    #[arg(long, global = true, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    #[arg(long = "sanity-project", env = "SANITY_PROJECT_ID", default_value = "shxuue68", global = true)]
    project_id: String,

    #[arg(long = "sanity-dataset", env = "SANITY_DATASET", default_value = "production", global = true)]
    dataset: String,

    #[arg(long = "sanity-api-version", env = "SANITY_API_VERSION", default_value = "2023-05-03", global = true)]
    api_version: String,

    /// Query the live API instead of the CDN.
    #[arg(long, global = true)]
    no_cdn: bool,

    #[arg(long = "sanity-token", env = "SANITY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

impl SourceArgs {
    fn open(&self) -> Result<ContentSource, Box<dyn Error>> {
        if let Some(path) = &self.snapshot {
            return Ok(ContentSource::snapshot_file(path)?);
        }
        let config = SanityConfig {
            project_id: self.project_id.clone(),
            dataset: self.dataset.clone(),
            api_version: self.api_version.clone(),
            use_cdn: !self.no_cdn,
            token: self.token.clone(),
            api_host: None,
        };
        Ok(ContentSource::sanity(config)?)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the search box matcher once and print the dropdown.
    Search {
        /// Text typed into the search box.
        query: String,
    },
    /// Drive the search box from stdin, one event per line.
    ///
    /// Plain lines replace the query. `:focus`, `:blur`, `:clear`,
    /// `:select <id>` and `:quit` trigger the matching events.
    Overlay,
    /// List FAQs, newest first.
    Faqs {
        /// Only show the newest N.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a single FAQ.
    Faq {
        slug: String,
    },
    /// Show an author and the questions they answered.
    Author {
        slug: String,
    },
    /// List FAQs carrying a keyword, given as written or as its URL slug.
    Tag {
        tag: String,
    },
    /// Print the JSON-LD generated for a page.
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Serve the site over HTTP (requires the `web` feature).
    Serve {
        /// Socket address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        /// Public origin for canonical links and the sitemap.
        #[arg(long, default_value = "https://upffaqs.com")]
        base_url: String,
    },
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// WebSite and Organization graph for the home page.
    Home,
    /// FAQ page graph, or the FAQ's custom markup when it is valid JSON.
    Faq { slug: String },
    /// ProfilePage for an author.
    Author { slug: String },
    /// CollectionPage for a tag archive.
    Tag { tag: String },
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let runtime = Runtime::new()?;
    let content = cli.source.open()?;
    let as_json = cli.json;
    runtime.block_on(async move {
        match cli.command {
            Command::Search { query } => handle_search(&content, &query, as_json).await,
            Command::Overlay => handle_overlay(&content, as_json).await,
            Command::Faqs { limit } => handle_faqs(&content, limit, as_json).await,
            Command::Faq { slug } => handle_faq(&content, &slug, as_json).await,
            Command::Author { slug } => handle_author(&content, &slug, as_json).await,
            Command::Tag { tag } => handle_tag(&content, &tag, as_json).await,
            Command::Schema(command) => handle_schema(&content, command).await,
            Command::Serve { addr, base_url } => serve(content, addr, base_url).await,
        }
    })
}

#[cfg(feature = "web")]
async fn serve(content: ContentSource, addr: SocketAddr, base_url: String) -> Result<(), Box<dyn Error>> {
    let config = upf_faqs::web::WebConfig {
        addr,
        base_url,
        ..upf_faqs::web::WebConfig::default()
    };
    upf_faqs::web::serve(config, content).await?;
    Ok(())
}

#[cfg(not(feature = "web"))]
async fn serve(_content: ContentSource, _addr: SocketAddr, _base_url: String) -> Result<(), Box<dyn Error>> {
    Err("the HTTP server is disabled. Rebuild with `--features web` to enable it.".into())
}

async fn handle_search(content: &ContentSource, query: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let candidates = content.search_candidates().await?;
    let mut overlay = SearchOverlay::new(candidates, SearchConfig::default());
    overlay.input(query);
    let mut stdout = io::stdout().lock();
    write_view(&mut stdout, &overlay.view(), as_json, stdout_is_tty())?;
    Ok(())
}

async fn handle_overlay(content: &ContentSource, as_json: bool) -> Result<(), Box<dyn Error>> {
    let candidates = content.search_candidates().await?;
    info!(candidates = candidates.len(), "search box ready");
    let mut overlay = SearchOverlay::new(candidates, SearchConfig::default());
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    drive_overlay(&mut overlay, stdin, &mut stdout, as_json, stdout_is_tty())
}

#[derive(Debug, PartialEq, Eq)]
enum OverlayEvent<'a> {
    Focus,
    Blur,
    Clear,
    Select(&'a str),
    Input(&'a str),
    Quit,
}

impl<'a> OverlayEvent<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim_end_matches(['\r', '\n']) {
            ":focus" => Self::Focus,
            ":blur" => Self::Blur,
            ":clear" => Self::Clear,
            ":quit" | ":q" => Self::Quit,
            other => match other.strip_prefix(":select ") {
                Some(id) => Self::Select(id.trim()),
                None => Self::Input(other),
            },
        }
    }
}

fn drive_overlay<R, W>(
    overlay: &mut SearchOverlay,
    input: R,
    out: &mut W,
    as_json: bool,
    styled: bool,
) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        match OverlayEvent::parse(&line) {
            OverlayEvent::Quit => break,
            OverlayEvent::Focus => {
                overlay.focus();
            }
            OverlayEvent::Blur => {
                overlay.click_outside();
            }
            OverlayEvent::Clear => {
                overlay.clear();
            }
            OverlayEvent::Input(text) => {
                overlay.input(text);
            }
            OverlayEvent::Select(id) => match overlay.select(id) {
                Some(request) => {
                    if as_json {
                        writeln!(out, "{}", json!({ "navigate": request }))?;
                    } else {
                        writeln!(out, "navigate: {}", faq_path(&request.locator))?;
                    }
                }
                None => {
                    if !as_json {
                        writeln!(out, "no result with id {id:?}")?;
                    }
                }
            },
        }
        write_view(out, &overlay.view(), as_json, styled)?;
    }
    Ok(())
}

fn write_view<W: Write>(out: &mut W, view: &OverlayView<'_>, as_json: bool, styled: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload = json!({
            "state": view.state,
            "query": view.query,
            "label": view.result_label(),
            "results": view.results,
        });
        writeln!(out, "{payload}")?;
        return Ok(());
    }
    match view.state {
        OverlayState::Closed => writeln!(out, "[closed] query: {:?}", view.query)?,
        OverlayState::OpenEmpty => writeln!(out, "[open] keep typing to search")?,
        OverlayState::OpenNoResults => {
            writeln!(out, "No results found")?;
            writeln!(out, "No UPF FAQs match \"{}\"", view.query)?;
        }
        OverlayState::OpenResults => {
            writeln!(out, "{}", view.result_label())?;
            for result in &view.results {
                writeln!(
                    out,
                    "- {}  ({} -> {})",
                    paint(&result.question, styled),
                    result.id,
                    faq_path(result.locator)
                )?;
                if let Some(summary) = &result.summary {
                    writeln!(out, "    {}", paint(summary, styled))?;
                }
            }
        }
    }
    Ok(())
}

fn paint(segments: &[Segment<'_>], styled: bool) -> String {
    segments
        .iter()
        .map(|segment| match (segment.is_match(), styled) {
            (false, _) => segment.text.to_string(),
            (true, true) => segment.text.to_string().black().on_yellow().to_string(),
            (true, false) => format!("[{}]", segment.text),
        })
        .collect()
}

async fn handle_faqs(content: &ContentSource, limit: Option<usize>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let faqs = match limit {
        Some(limit) => content.latest_faqs(limit.max(1)).await?,
        None => content.all_faqs().await?,
    };
    print_faq_list(&faqs, as_json, "No FAQs published yet.")
}

async fn handle_faq(content: &ContentSource, slug: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let faq = content
        .faq(slug)
        .await?
        .ok_or_else(|| format!("No FAQ found for slug {slug:?}"))?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&faq)?);
        return Ok(());
    }
    println!("{}", faq.question);
    println!("{}", faq_path(slug));
    if let Some(author) = &faq.author {
        println!("By {}", author.name);
    }
    if let Some(date) = faq.published_date() {
        println!("Published {date}");
    }
    if !faq.keywords.is_empty() {
        println!("Tags: {}", faq.keywords.join(", "));
    }
    if let Some(summary) = faq.summary() {
        println!("\nSummary: {summary}");
    }
    render_markdown_block("Answer", &to_markdown(&faq.answer));
    let related: Vec<_> = faq
        .related_faqs
        .iter()
        .filter_map(|row| row.validate())
        .collect();
    if !related.is_empty() {
        println!("\nRelated:");
        for candidate in related {
            println!("- {} ({})", candidate.question, faq_path(candidate.locator));
        }
    }
    Ok(())
}

async fn handle_author(content: &ContentSource, slug: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let author = content
        .author(slug)
        .await?
        .ok_or_else(|| format!("No author found for slug {slug:?}"))?;
    let faqs = match author.id.as_deref() {
        Some(id) => content.author_faqs(id).await?,
        None => Vec::new(),
    };
    if as_json {
        let payload = json!({ "author": author, "faqs": faqs });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    println!("{} ({})", author.name, author_path(slug));
    if let Some(job_title) = author.job_title() {
        println!("{job_title}");
    }
    if !author.expertise.is_empty() {
        println!("Expertise: {}", author.expertise.join(", "));
    }
    if let Some(social) = &author.social_media {
        for link in social.same_as() {
            println!("  {link}");
        }
    }
    render_markdown_block("Bio", &to_markdown(&author.bio));
    println!();
    print_faq_list(&faqs, false, "No published answers yet.")
}

async fn handle_tag(content: &ContentSource, tag: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let faqs = content.tag_faqs(tag).await?;
    if faqs.is_empty() {
        return Err(format!("No FAQs are tagged {:?}", display_tag(&tag_slug(tag))).into());
    }
    let label = tag_label(&faqs, tag);
    if !as_json {
        println!("{label}:");
    }
    print_faq_list(&faqs, as_json, "")
}

async fn handle_schema(content: &ContentSource, command: SchemaCommand) -> Result<(), Box<dyn Error>> {
    let site = content.site_settings().await?;
    let images = ImageUrlBuilder::default();
    let value = match command {
        SchemaCommand::Home => schema::home_page(&site, &images),
        SchemaCommand::Faq { slug } => {
            let faq = content
                .faq(&slug)
                .await?
                .ok_or_else(|| format!("No FAQ found for slug {slug:?}"))?;
            schema::faq_page(&faq, &site, &images)
        }
        SchemaCommand::Author { slug } => {
            let author = content
                .author(&slug)
                .await?
                .ok_or_else(|| format!("No author found for slug {slug:?}"))?;
            schema::author_profile_page(&author, &site, &images)
        }
        SchemaCommand::Tag { tag } => {
            let faqs = content.tag_faqs(&tag).await?;
            let label = tag_label(&faqs, &tag);
            schema::tag_collection_page(&label, &faqs, &site)
        }
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_faq_list(faqs: &[Faq], as_json: bool, empty_message: &str) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload: Vec<_> = faqs
            .iter()
            .map(|faq| {
                json!({
                    "id": faq.id,
                    "question": faq.question,
                    "slug": faq.slug(),
                    "summary": faq.summary(),
                    "published_at": faq.published_at,
                    "keywords": faq.keywords,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if faqs.is_empty() {
        println!("{empty_message}");
        return Ok(());
    }
    let width = faqs
        .iter()
        .map(|faq| faq.published_date().map(|d| d.len()).unwrap_or(0))
        .max()
        .unwrap_or(0)
        .max("DATE".len());
    println!("{:<width$}  {}", "DATE", "QUESTION", width = width);
    println!("{:-<width$}  {}", "", "--------", width = width);
    for faq in faqs {
        let date = faq.published_date().unwrap_or_default();
        println!("{:<width$}  {}", date, faq.question, width = width);
        if let Some(slug) = faq.slug() {
            println!("{:<width$}  {}", "", faq_path(slug), width = width);
        }
    }
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use upf_faqs::SearchFaq;

    fn overlay() -> SearchOverlay {
        SearchOverlay::new(
            vec![
                SearchFaq::new("1", "Is sugar a UPF?", "is-sugar-a-upf", Some("Yes, often.")),
                SearchFaq::new("2", "Are additives safe?", "are-additives-safe", Some("Depends.")),
            ],
            SearchConfig::default(),
        )
    }

    fn drive(script: &str, as_json: bool) -> String {
        let mut overlay = overlay();
        let mut out = Vec::new();
        drive_overlay(&mut overlay, Cursor::new(script), &mut out, as_json, false).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_overlay_events() {
        assert_eq!(OverlayEvent::parse(":focus"), OverlayEvent::Focus);
        assert_eq!(OverlayEvent::parse(":select 42 "), OverlayEvent::Select("42"));
        assert_eq!(OverlayEvent::parse("sugar"), OverlayEvent::Input("sugar"));
        assert_eq!(OverlayEvent::parse(""), OverlayEvent::Input(""));
        assert_eq!(OverlayEvent::parse(":q"), OverlayEvent::Quit);
    }

    #[test]
    fn scripted_session_walks_every_state() {
        let output = drive("a\nsugar\nzz\n:blur\n:focus\n:clear\n", false);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "[open] keep typing to search");
        assert_eq!(lines[1], "Found 1 result");
        assert_eq!(lines[2], "- Is [sugar] a UPF?  (1 -> /faqs/is-sugar-a-upf)");
        assert_eq!(lines[3], "    Yes, often.");
        assert_eq!(lines[4], "No results found");
        assert_eq!(lines[6], "[closed] query: \"zz\"");
        assert_eq!(lines[7], "No results found");
        assert_eq!(lines[9], "[open] keep typing to search");
    }

    #[test]
    fn selecting_prints_navigation_and_closes() {
        let output = drive("sugar\n:select 2\n:select 1\n", false);
        assert!(output.contains("no result with id \"2\""));
        assert!(output.contains("navigate: /faqs/is-sugar-a-upf"));
        assert!(output.trim_end().ends_with("[closed] query: \"\""));
    }

    #[test]
    fn quit_stops_reading() {
        let output = drive("sugar\n:quit\nadd\n", false);
        assert!(!output.contains("additives"));
    }

    #[test]
    fn json_mode_emits_one_object_per_event() {
        let output = drive("SUGAR\n:select 1\n", true);
        let events: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events[0]["state"], "open-results");
        assert_eq!(events[0]["results"][0]["question"][1]["text"], "sugar");
        assert_eq!(events[1]["navigate"]["locator"], "is-sugar-a-upf");
        assert_eq!(events[2]["state"], "closed");
    }

    #[test]
    fn paint_marks_matches() {
        let segments = upf_faqs::highlight("Sugar and sugar", "sugar");
        assert_eq!(paint(&segments, false), "[Sugar] and [sugar]");
    }
}
