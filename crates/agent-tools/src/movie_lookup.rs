use agent_core::error::AgentError;
use agent_core::tool_registry::Tool;
use agent_db::{Lookup, MovieCatalog};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

/// Which catalog field a lookup tool searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieField {
    Actor,
    Title,
    Director,
    Year,
    Genre,
}

impl MovieField {
    pub const ALL: [MovieField; 5] = [
        MovieField::Actor,
        MovieField::Title,
        MovieField::Director,
        MovieField::Year,
        MovieField::Genre,
    ];

    fn tool_name(self) -> &'static str {
        match self {
            MovieField::Actor => "get_movies_by_actor",
            MovieField::Title => "get_movies_by_title",
            MovieField::Director => "get_movies_by_director",
            MovieField::Year => "get_movies_by_year",
            MovieField::Genre => "get_movies_by_genre",
        }
    }

    fn description(self) -> &'static str {
        match self {
            MovieField::Actor => "Use this tool whenever the user asks for movies by actor.",
            MovieField::Title => "Use this tool whenever the user asks for movies by title.",
            MovieField::Director => "Use this tool whenever the user asks for movies by director.",
            MovieField::Year => "Use this tool whenever the user asks for movies by year.",
            MovieField::Genre => "Use this tool whenever the user asks for movies by genre.",
        }
    }

    /// Name of the single argument the tool takes.
    fn arg_name(self) -> &'static str {
        match self {
            MovieField::Actor => "actor",
            MovieField::Title => "title",
            MovieField::Director => "director",
            MovieField::Year => "year",
            MovieField::Genre => "genre",
        }
    }
}

/// Exposes one catalog lookup as a model-callable tool.
pub struct MovieLookupTool {
    field: MovieField,
    catalog: MovieCatalog,
}

impl MovieLookupTool {
    pub fn new(field: MovieField, catalog: MovieCatalog) -> Self {
        Self { field, catalog }
    }

    fn invalid(&self, message: String) -> AgentError {
        AgentError::ToolExecution {
            tool_name: self.field.tool_name().into(),
            message,
        }
    }

    /// Turn the model's argument object into a catalog lookup.
    fn lookup(&self, args: &Value) -> Result<Lookup, AgentError> {
        let key = self.field.arg_name();
        let value = args
            .get(key)
            .ok_or_else(|| self.invalid(format!("Invalid arguments: missing '{}'", key)))?;

        let text = || {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(format!("Invalid arguments: '{}' must be a string, got {}", key, value)))
        };
        Ok(match self.field {
            MovieField::Actor => Lookup::Actor(text()?),
            MovieField::Title => Lookup::Title(text()?),
            MovieField::Director => Lookup::Director(text()?),
            MovieField::Genre => Lookup::Genre(text()?),
            MovieField::Year => {
                let year = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| self.invalid(format!("Invalid arguments: 'year' must be an integer, got {}", value)))?;
                Lookup::Year(year)
            }
        })
    }
}

#[async_trait]
impl Tool for MovieLookupTool {
    fn name(&self) -> &str {
        self.field.tool_name()
    }

    fn description(&self) -> &str {
        self.field.description()
    }

    fn parameters_schema(&self) -> Value {
        let key = self.field.arg_name();
        let kind = if self.field == MovieField::Year { "integer" } else { "string" };
        json!({
            "type": "object",
            "properties": {
                key: {
                    "type": kind,
                    "description": format!("The {} to search for", key)
                }
            },
            "required": [key]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, AgentError> {
        let lookup = self.lookup(&args)?;
        match self.catalog.find(lookup).await {
            Ok(movies) => Ok(serde_json::to_string(&movies)?),
            Err(e) => {
                // Store failures stay distinguishable from an empty `[]`.
                warn!("{} failed: {}", self.field.tool_name(), e);
                Ok(json!({
                    "error": format!("movie catalog unavailable: {}", e),
                    "movies": []
                })
                .to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded(tmp: &TempDir) -> MovieCatalog {
        let catalog = MovieCatalog::create(tmp.path().join("movies.db")).unwrap();
        catalog
            .import(vec![
                json!({
                    "title": "Pulp Fiction",
                    "actors": ["John Travolta", "Uma Thurman"],
                    "director": "Quentin Tarantino",
                    "year": 1994,
                    "genre": "Crime"
                }),
                json!({
                    "title": "Saturday Night Fever",
                    "actors": ["John Travolta"],
                    "director": "John Badham",
                    "year": 1977,
                    "genre": ["Drama", "Music"]
                }),
            ])
            .await
            .unwrap();
        catalog
    }

    fn titles(output: &str) -> Vec<String> {
        let movies: Vec<Value> = serde_json::from_str(output).unwrap();
        movies
            .iter()
            .map(|m| m["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_actor_lookup_returns_json_records() {
        let tmp = TempDir::new().unwrap();
        let tool = MovieLookupTool::new(MovieField::Actor, seeded(&tmp).await);

        let out = tool.execute(json!({"actor": "Travolta"})).await.unwrap();
        assert_eq!(titles(&out), vec!["Pulp Fiction", "Saturday Night Fever"]);
    }

    #[tokio::test]
    async fn test_year_accepts_number_or_numeric_string() {
        let tmp = TempDir::new().unwrap();
        let tool = MovieLookupTool::new(MovieField::Year, seeded(&tmp).await);

        let out = tool.execute(json!({"year": 1977})).await.unwrap();
        assert_eq!(titles(&out), vec!["Saturday Night Fever"]);
        let out = tool.execute(json!({"year": "1994"})).await.unwrap();
        assert_eq!(titles(&out), vec!["Pulp Fiction"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_array() {
        let tmp = TempDir::new().unwrap();
        let tool = MovieLookupTool::new(MovieField::Genre, seeded(&tmp).await);

        let out = tool.execute(json!({"genre": "Western"})).await.unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn test_store_failure_is_degraded_marker() {
        let tmp = TempDir::new().unwrap();
        let tool = MovieLookupTool::new(MovieField::Title, MovieCatalog::open(tmp.path().join("missing.db")));

        let out = tool.execute(json!({"title": "Heat"})).await.unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert!(parsed["error"].as_str().unwrap().contains("unavailable"));
        assert_eq!(parsed["movies"], json!([]));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_tool_errors() {
        let tmp = TempDir::new().unwrap();
        let catalog = seeded(&tmp).await;

        let actor = MovieLookupTool::new(MovieField::Actor, catalog.clone());
        let err = actor.execute(json!({"name": "Travolta"})).await.unwrap_err();
        assert!(err.to_string().contains("missing 'actor'"), "got: {err}");

        let year = MovieLookupTool::new(MovieField::Year, catalog);
        let err = year.execute(json!({"year": "nineteen"})).await.unwrap_err();
        assert!(err.to_string().contains("must be an integer"), "got: {err}");
    }

    #[test]
    fn test_schema_declares_single_required_argument() {
        let tool = MovieLookupTool::new(MovieField::Year, MovieCatalog::open("unused.db"));
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], json!(["year"]));
        assert_eq!(schema["properties"]["year"]["type"], "integer");
        assert_eq!(tool.name(), "get_movies_by_year");
    }
}
