use clap::Parser;
use indoc::formatdoc;
use itertools::Itertools;
use miette::Result;
use nlu::Config;
use serde_json::Value;

/// Send one utterance to the Dialogflow agent and print the normalized reply.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Text to send, as a user would type it
    utterance: String,

    /// Reuse an existing session instead of starting a new one
    #[arg(long)]
    session: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let client = config.client()?;

    let session = cli
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let reply = nlu::exchange(&client, &session, cli.utterance.trim()).await?;

    let buttons = reply
        .payload
        .as_ref()
        .and_then(|payload| payload.get("buttons"))
        .and_then(Value::as_array)
        .map(|buttons| {
            buttons
                .iter()
                .filter_map(|button| button.get("title").and_then(Value::as_str))
                .join(", ")
        })
        .unwrap_or_default();

    println!(
        "{}",
        formatdoc!(
            "
            reply:   {text}
            intent:  {intent}
            buttons: {buttons}
            session: {session}
            ",
            text = reply.text,
            intent = reply.intent,
            buttons = buttons,
            session = session,
        )
    );

    Ok(())
}
