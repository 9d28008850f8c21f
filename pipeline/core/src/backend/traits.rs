//! Backend Traits and Shared Types

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ImageError, PromptError};
use crate::gallery::GeneratedArtifact;
use crate::messages::SimilarMovie;
use crate::request::GenerationRequest;

/// Prompt-synthesis backend
#[async_trait]
pub trait PromptBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Turn a request into an image prompt plus reference movies
    ///
    /// A success without a usable prompt is returned as-is; the controller
    /// decides that it is incomplete.
    async fn acquire(&self, request: &GenerationRequest) -> Result<PromptResult, PromptError>;
}

/// Image-synthesis service
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Generate up to `count` images for `prompt`
    ///
    /// An empty result is a valid outcome, not an error.
    async fn invoke(&self, prompt: &str, count: u8) -> Result<Vec<GeneratedArtifact>, ImageError>;
}

/// Source of the available genres
#[async_trait]
pub trait GenreCatalog: Send + Sync {
    /// Fetch the genre list in display order
    async fn fetch_genres(&self) -> anyhow::Result<Vec<String>>;
}

/// Successful prompt-backend response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    /// Synthesized image prompt
    #[serde(default)]
    pub prompt: Option<String>,
    /// Staged status labels, in reveal order
    #[serde(default)]
    pub loading_updates: Vec<String>,
    /// Reference movie title to director, in response order
    #[serde(default, with = "ordered_pairs")]
    pub movie_titles: Vec<(String, String)>,
    /// IMDb ids of the reference movies
    #[serde(default, rename = "imdbIDs")]
    pub imdb_ids: Vec<String>,
}

impl PromptResult {
    /// Create a result with a prompt and nothing else
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// The prompt, if present and not blank
    #[must_use]
    pub fn usable_prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// One similar movie per `movie_titles` entry, same order
    #[must_use]
    pub fn similar_movies(&self) -> Vec<SimilarMovie> {
        self.movie_titles
            .iter()
            .map(|(title, director)| SimilarMovie::new(title.clone(), director.clone()))
            .collect()
    }
}

/// JSON object <-> ordered list of pairs, keeping response order
mod ordered_pairs {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;

    use super::{Deserializer, Serializer};

    pub fn serialize<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (key, value) in pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping movie titles to directors")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                // A null director is kept as an empty name
                while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
                    pairs.push((key, value.unwrap_or_default()));
                }
                Ok(pairs)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Vec::new())
            }
        }

        deserializer.deserialize_any(PairsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_similar_movies_follow_response_order() {
        let result: PromptResult = serde_json::from_str(
            r#"{
                "prompt": "A lone pilot in a storm",
                "loadingUpdates": ["Scanning plots", "Matching genres"],
                "movieTitles": {"Film B": "Dir Y", "Film A": "Dir X"},
                "imdbIDs": ["tt1", "tt2"]
            }"#,
        )
        .unwrap();

        assert_eq!(
            result.similar_movies(),
            vec![
                SimilarMovie::new("Film B", "Dir Y"),
                SimilarMovie::new("Film A", "Dir X"),
            ]
        );
        assert_eq!(result.imdb_ids, vec!["tt1", "tt2"]);
        assert_eq!(result.usable_prompt(), Some("A lone pilot in a storm"));
    }

    #[test]
    fn test_null_director_does_not_fail_the_result() {
        let result: PromptResult = serde_json::from_str(
            r#"{"prompt": "p", "movieTitles": {"Alien": null, "Heat": "Michael Mann"}}"#,
        )
        .unwrap();

        assert_eq!(
            result.similar_movies(),
            vec![
                SimilarMovie::new("Alien", ""),
                SimilarMovie::new("Heat", "Michael Mann"),
            ]
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let result: PromptResult = serde_json::from_str(r#"{"movieTitles": null}"#).unwrap();
        assert_eq!(result, PromptResult::default());
        assert_eq!(result.usable_prompt(), None);

        let blank = PromptResult::with_prompt("   ");
        assert_eq!(blank.usable_prompt(), None);
    }

    #[test]
    fn test_serializes_back_to_wire_shape() {
        let result = PromptResult {
            prompt: Some("p".to_string()),
            loading_updates: vec!["one".to_string()],
            movie_titles: vec![("Interstellar".to_string(), "Christopher Nolan".to_string())],
            imdb_ids: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["movieTitles"]["Interstellar"], "Christopher Nolan");
        assert_eq!(json["loadingUpdates"][0], "one");
    }
}
