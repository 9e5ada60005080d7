use std::fs;

use rust_embed::Embed;

use crate::error::LoadError;
use crate::prompt::{Prompt, normalize};

pub const EMBEDDED_PREFIX: &str = "embedded:";

/// Pronoun columns of the verb table, in conjugation order.
pub const PRONOUNS: &[(&str, &str)] = &[
    ("yo", "yo"),
    ("tu", "tú"),
    ("él", "él/ella"),
    ("nosotros", "nosotros/as"),
    ("vosotros", "vosotros/as"),
    ("ellos", "ellos/ellas"),
];

#[derive(Embed)]
#[folder = "assets/data/"]
struct BundledData;

/// Supplies the prompt pool for an exercise.
pub trait PromptSource {
    fn load(&self, path: &str) -> Result<Vec<Prompt>, LoadError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsvFormat {
    /// `category  es  de`
    Words,
    /// `infinitive  de  yo  tu  él  nosotros  vosotros  ellos`
    Verbs,
    /// `category  de  es_with_blank  correct_answer  wrong_answers`
    Cloze,
}

/// Loads tab-separated tables from disk, over http or from the bundled data.
pub struct TsvSource {
    format: TsvFormat,
}

impl TsvSource {
    pub fn new(format: TsvFormat) -> Self {
        Self { format }
    }
}

impl PromptSource for TsvSource {
    fn load(&self, path: &str) -> Result<Vec<Prompt>, LoadError> {
        let text = read_text(path)?;
        let prompts = parse(&text, self.format, path)?;
        if prompts.is_empty() {
            return Err(LoadError::Empty(path.to_string()));
        }
        tracing::debug!(path, count = prompts.len(), "loaded prompts");
        Ok(prompts)
    }
}

fn read_text(path: &str) -> Result<String, LoadError> {
    if let Some(name) = path.strip_prefix(EMBEDDED_PREFIX) {
        let file =
            BundledData::get(name).ok_or_else(|| LoadError::MissingEmbedded(name.to_string()))?;
        return String::from_utf8(file.data.into_owned()).map_err(|_| LoadError::Encoding {
            path: path.to_string(),
        });
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return fetch_url(path);
    }
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })
}

#[cfg(feature = "network")]
fn fetch_url(url: &str) -> Result<String, LoadError> {
    let network = |message: String| LoadError::Network {
        url: url.to_string(),
        message,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| network(e.to_string()))?;
    let response = client.get(url).send().map_err(|e| network(e.to_string()))?;
    if !response.status().is_success() {
        return Err(network(format!("HTTP {}", response.status())));
    }
    response.text().map_err(|e| network(e.to_string()))
}

#[cfg(not(feature = "network"))]
fn fetch_url(url: &str) -> Result<String, LoadError> {
    Err(LoadError::Network {
        url: url.to_string(),
        message: "built without network support".to_string(),
    })
}

struct Table<'a> {
    header: Vec<String>,
    rows: Vec<Vec<&'a str>>,
}

impl<'a> Table<'a> {
    fn parse(text: &'a str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .map(|l| l.split('\t').map(|h| h.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = lines.map(|l| l.split('\t').collect()).collect();
        Self { header, rows }
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn require(&self, name: &'static str, path: &str) -> Result<usize, LoadError> {
        self.column(name).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_string(),
            column: name,
        })
    }
}

fn cell(row: &[&str], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .map(|c| normalize(c))
        .unwrap_or_default()
}

/// Parse a table in the given format. Rows missing required cells are dropped.
pub fn parse(text: &str, format: TsvFormat, path: &str) -> Result<Vec<Prompt>, LoadError> {
    let table = Table::parse(text);
    let prompts = match format {
        TsvFormat::Words => {
            let category = Some(table.require("category", path)?);
            let es = Some(table.require("es", path)?);
            let de = Some(table.require("de", path)?);
            table
                .rows
                .iter()
                .map(|row| {
                    Prompt::word(&cell(row, category), &cell(row, de), &cell(row, es))
                })
                .filter(|p| !p.category.is_empty() && !p.source.is_empty() && !p.target.is_empty())
                .collect()
        }
        TsvFormat::Verbs => {
            let infinitive = Some(table.require("infinitive", path)?);
            let de = Some(table.require("de", path)?);
            let pronoun_cols: Vec<Option<usize>> = PRONOUNS
                .iter()
                .map(|(key, _)| table.column(key))
                .collect();
            table
                .rows
                .iter()
                .filter_map(|row| {
                    let inf = cell(row, infinitive);
                    let source = cell(row, de);
                    if inf.is_empty() || source.is_empty() {
                        return None;
                    }
                    let forms: Vec<String> =
                        pronoun_cols.iter().map(|&c| cell(row, c)).collect();
                    if forms.iter().any(|f| f.is_empty()) {
                        tracing::debug!(infinitive = %inf, "skipping verb with missing forms");
                        return None;
                    }
                    Some(Prompt::verb(&source, &inf, forms))
                })
                .collect()
        }
        TsvFormat::Cloze => {
            let category = table.column("category");
            let de = Some(table.require("de", path)?);
            let with_blank = Some(table.require("es_with_blank", path)?);
            let answer = Some(table.require("correct_answer", path)?);
            let wrong = table.column("wrong_answers");
            table
                .rows
                .iter()
                .map(|row| {
                    let wrong_answers = cell(row, wrong)
                        .split(',')
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect();
                    Prompt::cloze(
                        &cell(row, category),
                        &cell(row, de),
                        &cell(row, with_blank),
                        &cell(row, answer),
                        wrong_answers,
                    )
                })
                .filter(|p| {
                    !p.source.is_empty()
                        && !p.target.is_empty()
                        && p.cloze.as_deref().is_some_and(|c| !c.is_empty())
                })
                .collect()
        }
    };
    Ok(prompts)
}
