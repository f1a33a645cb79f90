//! Ask command - answer one question and exit

use clap::Args;
use tracing::{info, warn};

use crate::infrastructure::logging;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question; multiple words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    words: Vec<String>,
}

impl AskArgs {
    pub fn question(&self) -> String {
        self.words.join(" ")
    }
}

/// Print the answer on stdout and its sources on stderr.
/// The cache write is awaited before exiting.
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = super::load_config()?;
    logging::init_logging(&(&config.logging).into());

    let components = crate::create_components(&config).await?;

    let mut outcome = components.answer_service.answer(&args.question()).await?;
    info!(cache = outcome.cache_status.as_str(), "Answered question");

    println!("{}", outcome.answer);
    if let Some(sources) = format_sources(&outcome.citations) {
        eprint!("{}", sources);
    }

    if let Some(write) = outcome.take_pending_write() {
        let key = write.key().to_string();
        if let Err(e) = write.wait().await {
            warn!(key = %key, error = %e, "Answer was not cached");
        }
    }

    Ok(())
}

fn format_sources(citations: &[String]) -> Option<String> {
    if citations.is_empty() {
        return None;
    }

    let mut out = String::from("Sources:\n");
    for citation in citations {
        out.push_str("  - ");
        out.push_str(citation);
        out.push('\n');
    }
    Some(out)
}
