use once_cell::sync::Lazy;
use regex::Regex;

/// Facts and topic labels found in one user message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub facts: Vec<(String, String)>,
    pub topics: Vec<String>,
}

/// Pulls user facts and discussion topics out of free text
pub trait FactExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Extraction;
}

pub const NAME_FACT: &str = "name";

static DEFAULT_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bmy name is\s+(\p{L}[\p{L}'-]*)",
        r"(?i)\bcall me\s+(\p{L}[\p{L}'-]*)",
        r"(?i)\bje m'appelle\s+(\p{L}[\p{L}'-]*)",
        r"(?i)\bmon (?:nom|prénom) est\s+(\p{L}[\p{L}'-]*)",
        // Capitalised word only, "I am tired" is not a name
        r"\bI(?:'m| am)\s+(\p{Lu}[\p{L}'-]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("built-in name pattern is valid"))
    .collect()
});

const DEFAULT_TOPICS: &[(&str, &[&str])] = &[
    ("programming", &["code", "coding", "rust", "python", "javascript", "programming", "programmation", "bug"]),
    ("travel", &["travel", "trip", "voyage", "vacances", "flight", "vol"]),
    ("cooking", &["recipe", "recette", "cuisine", "cooking", "cook"]),
    ("music", &["music", "musique", "song", "chanson", "concert"]),
    ("health", &["health", "santé", "sante", "sport", "exercise", "doctor", "médecin"]),
    ("work", &["job", "travail", "work", "career", "carrière", "interview", "entretien"]),
    ("weather", &["weather", "météo", "meteo", "rain", "pluie"]),
];

/// Regex name detection plus a keyword table for topics
pub struct PhraseFactExtractor {
    name_patterns: Vec<Regex>,
    topics: Vec<(String, Vec<String>)>,
}

impl PhraseFactExtractor {
    /// Custom patterns; each must have one capture group holding the name
    pub fn new(name_patterns: &[&str], topics: &[(&str, &[&str])]) -> Result<Self, regex::Error> {
        let name_patterns = name_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name_patterns,
            topics: owned_topics(topics),
        })
    }

    fn detect_name(&self, text: &str) -> Option<String> {
        self.name_patterns
            .iter()
            .find_map(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| capitalize(m.as_str()))
    }

    fn detect_topics(&self, text: &str) -> Vec<String> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        self.topics
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
            .map(|(label, _)| label.clone())
            .collect()
    }
}

impl Default for PhraseFactExtractor {
    fn default() -> Self {
        Self {
            name_patterns: DEFAULT_NAME_PATTERNS.clone(),
            topics: owned_topics(DEFAULT_TOPICS),
        }
    }
}

impl FactExtractor for PhraseFactExtractor {
    fn extract(&self, text: &str) -> Extraction {
        let mut extraction = Extraction {
            facts: Vec::new(),
            topics: self.detect_topics(text),
        };
        if let Some(name) = self.detect_name(text) {
            extraction.facts.push((NAME_FACT.to_string(), name));
        }
        extraction
    }
}

fn owned_topics(topics: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    topics
        .iter()
        .map(|(label, keywords)| {
            (
                label.to_string(),
                keywords.iter().map(|k| k.to_lowercase()).collect(),
            )
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_name_in_english_and_french() {
        let extractor = PhraseFactExtractor::default();

        let e = extractor.extract("Hello, my name is alice and I like Rust");
        assert_eq!(e.facts, vec![("name".to_string(), "Alice".to_string())]);

        let e = extractor.extract("Bonjour, je m'appelle JEAN-luc");
        assert_eq!(e.facts, vec![("name".to_string(), "Jean-luc".to_string())]);

        let e = extractor.extract("Mon prénom est Éloïse.");
        assert_eq!(e.facts, vec![("name".to_string(), "Éloïse".to_string())]);
    }

    #[test]
    fn test_i_am_needs_capitalised_name() {
        let extractor = PhraseFactExtractor::default();
        let e = extractor.extract("Hi, I am Ben");
        assert_eq!(e.facts, vec![("name".to_string(), "Ben".to_string())]);

        assert!(extractor.extract("I am tired today").facts.is_empty());
    }

    #[test]
    fn test_no_name_no_fact() {
        let extractor = PhraseFactExtractor::default();
        assert!(extractor.extract("What's the weather like?").facts.is_empty());
    }

    #[test]
    fn test_topics_by_keyword() {
        let extractor = PhraseFactExtractor::default();
        let e = extractor.extract("I have a bug in my Rust code, also planning a trip");
        assert_eq!(e.topics, vec!["programming".to_string(), "travel".to_string()]);

        // Whole words only
        assert!(extractor.extract("decoder").topics.is_empty());
    }

    #[test]
    fn test_custom_patterns() {
        let extractor = PhraseFactExtractor::new(
            &[r"(?i)\bich heiße\s+(\p{L}+)"],
            &[("football", &["fußball", "football"])],
        )
        .unwrap();

        let e = extractor.extract("Ich heiße max und mag Fußball");
        assert_eq!(e.facts, vec![("name".to_string(), "Max".to_string())]);
        assert_eq!(e.topics, vec!["football".to_string()]);

        assert!(PhraseFactExtractor::new(&["(unclosed"], &[]).is_err());
    }
}
