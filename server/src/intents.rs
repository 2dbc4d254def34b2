//! Static intent → fulfillment table served by the webhook.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use shared::Button;
use thiserror::Error;

const FALLBACK_TEXT: &str = "Sorry, I didn't understand that. Try asking about services or pricing.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Fulfillment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: &[(&str, &str)]) -> Self {
        Self {
            text: text.into(),
            buttons: buttons
                .iter()
                .map(|(title, payload)| Button::new(*title, *payload))
                .collect(),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum IntentTableError {
    #[error("could not read intent table {}", path.display())]
    #[diagnostic(code(server::intents::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("intent table is not valid JSON")]
    #[diagnostic(
        code(server::intents::parse),
        help("expected {{\"fallback\": \"...\", \"intents\": {{\"name\": {{\"text\": \"...\", \"buttons\": [{{\"title\": \"...\", \"payload\": \"...\"}}]}}}}}}")
    )]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct TableFile {
    #[serde(default)]
    fallback: Option<String>,
    intents: HashMap<String, Fulfillment>,
}

/// Exact, case-sensitive lookup; anything unknown gets the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentTable {
    entries: HashMap<String, Fulfillment>,
    fallback: Fulfillment,
}

impl IntentTable {
    pub fn new(
        entries: impl IntoIterator<Item = (String, Fulfillment)>,
        fallback_text: impl Into<String>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            fallback: Fulfillment::text(fallback_text),
        }
    }

    pub fn builtin() -> Self {
        let menu = Fulfillment::with_buttons(
            "Hi! Choose an option below:",
            &[
                ("AboutUs", "AboutUs"),
                ("What is Scriptbees?", "what is Scriptbees"),
                ("Documentation", "Documentation"),
                ("Contact support", "Contact support"),
            ],
        );

        let entries = [
            ("Default Welcome Intent", menu.clone()),
            ("Show_Options", menu),
            (
                "company_services",
                Fulfillment::with_buttons(
                    "We offer full-stack development, cloud solutions, AI/ML, modernization, and more. Want to explore next?",
                    &[
                        ("AI / ML Solutions", "AI ML services"),
                        ("Modernization", "application modernization"),
                        ("Development Process", "development process"),
                    ],
                ),
            ),
            (
                "company_modernization",
                Fulfillment::with_buttons(
                    "Absolutely! We modernize legacy systems, rebuild outdated apps, and improve performance.",
                    &[
                        ("Our Services", "What services do you offer"),
                        ("AI / ML Solutions", "AI ML services"),
                        ("Development Process", "development process"),
                    ],
                ),
            ),
            (
                "company_AI&ML",
                Fulfillment::with_buttons(
                    "Yes! We build AI models, ML pipelines, automation, predictive analytics, and chatbot systems.",
                    &[
                        ("Modernize My App", "application modernization"),
                        ("Our Services", "What services do you offer"),
                        ("Development Process", "development process"),
                    ],
                ),
            ),
            (
                "sd_process",
                Fulfillment::with_buttons(
                    "Our process includes requirement analysis, design, development, testing, deployment, and ongoing support.",
                    &[
                        ("Services", "What services do you offer"),
                        ("AI / ML", "AI ML services"),
                        ("Contact Support", "Contact support"),
                    ],
                ),
            ),
            (
                "Get_Pricing",
                Fulfillment::with_buttons(
                    "Here are our pricing tiers:",
                    &[
                        ("Starter - $9/mo", "Pricing Starter"),
                        ("Pro - $29/mo", "Pricing Pro"),
                        ("Enterprise - Contact Sales", "Contact support"),
                    ],
                ),
            ),
            (
                "Pricing",
                Fulfillment::text("Our pricing: Starter $9, Pro $29, Enterprise: contact sales."),
            ),
        ];

        Self::new(
            entries
                .into_iter()
                .map(|(name, fulfillment)| (name.to_owned(), fulfillment)),
            FALLBACK_TEXT,
        )
    }

    pub fn from_json(raw: &str) -> Result<Self, IntentTableError> {
        let file: TableFile = serde_json::from_str(raw)?;

        Ok(Self::new(
            file.intents,
            file.fallback.unwrap_or_else(|| FALLBACK_TEXT.to_owned()),
        ))
    }

    pub fn load(path: &Path) -> Result<Self, IntentTableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| IntentTableError::Read {
            path: path.to_owned(),
            source,
        })?;

        Self::from_json(&raw)
    }

    pub fn respond(&self, intent: &str) -> &Fulfillment {
        self.entries.get(intent).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Fulfillment {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
