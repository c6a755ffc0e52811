use anyhow::Result;
use console::style;

use super::{cancel_on_ctrl_c, report_failure};
use crate::app;
use crate::args::InputArgs;

pub async fn run(args: InputArgs) -> Result<()> {
    let config = app::load_run_config(args.language.clone())?;
    let payload = app::load_payload(&args.file)?;
    let analyzer = app::build_analyzer(&config.client)?;
    let cancel = cancel_on_ctrl_c();

    let transcript = match analyzer.transcribe(&payload, &config.language, &cancel).await {
        Ok(transcript) => transcript,
        Err(err) => {
            report_failure(&err);
            std::process::exit(1);
        }
    };

    println!("{}", style(format!("Transcription ({})", transcript.source_language)).bold());
    println!("{}\n", transcript.transcription.trim());
    if !transcript.translation.trim().is_empty() {
        println!("{}", style("Translation (English)").bold());
        println!("{}\n", transcript.translation.trim());
    }
    if !transcript.summary.trim().is_empty() {
        println!("{}", style("Summary").bold());
        println!("{}", transcript.summary.trim());
    }
    Ok(())
}
