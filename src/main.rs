//! storymark CLI - convert a Markdown story to accessible HTML

use std::io::{self, Read, Write};
use std::process::ExitCode;

use storymark::export::{standalone_document, ExportOptions};
use storymark::{Document, HeadingIds, Options};

const USAGE: &str = "\
usage: storymark [OPTIONS] [FILE|-]

Reads Markdown from FILE, or stdin when FILE is `-` or missing.

Options:
  --sections                 wrap each heading and its content in <article>
  --no-a11y                  skip ARIA roles and link/image attributes
  --no-html                  escape raw HTML instead of passing it through
  --heading-ids=slug|chapter add ids to headings
  --standalone               emit a complete HTML document
  --toc                      print the table of contents to stderr
  --stats                    print word count and reading time to stderr
  -h, --help                 show this help
";

#[derive(Debug, Default)]
struct Args {
    path: Option<String>,
    options: Options,
    standalone: bool,
    toc: bool,
    stats: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<Args>, String> {
    let mut parsed = Args::default();
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--sections" => parsed.options.sections = true,
            "--no-a11y" => parsed.options.accessibility = false,
            "--no-html" => parsed.options.allow_html = false,
            "--heading-ids=slug" => parsed.options.heading_ids = HeadingIds::Slug,
            "--heading-ids=chapter" => parsed.options.heading_ids = HeadingIds::Chapter,
            "--standalone" => parsed.standalone = true,
            "--toc" => parsed.toc = true,
            "--stats" => parsed.stats = true,
            "-" => parsed.path = None,
            flag if flag.starts_with('-') => return Err(format!("unknown option: {flag}")),
            path => parsed.path = Some(path.to_string()),
        }
    }
    Ok(Some(parsed))
}

fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run(args: Args) -> io::Result<()> {
    let input = read_input(args.path.as_deref())?;
    log::debug!("read {} bytes", input.len());

    let doc = Document::parse(&input, &args.options);

    let mut stderr = io::stderr().lock();
    if args.toc {
        for entry in &doc.toc {
            let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
            writeln!(stderr, "{indent}- {} (#{})", entry.text, entry.id)?;
        }
    }
    if args.stats {
        writeln!(
            stderr,
            "{} words, {} min read",
            doc.word_count, doc.reading_time
        )?;
    }

    let html = if args.standalone {
        standalone_document(&doc.html, &ExportOptions::default())
    } else {
        doc.html
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(html.as_bytes())?;
    if !html.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("storymark: {msg}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("storymark: {err}");
            ExitCode::FAILURE
        }
    }
}
