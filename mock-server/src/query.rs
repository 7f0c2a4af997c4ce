//! Tiny evaluator for the query shapes the mock server understands:
//! `match_all`, `match`, `query_string`, `equals` and `bool.must`.

use serde_json::{Map, Value};

/// Does `doc` satisfy `query`? Unknown query types are an error.
pub fn matches(doc: &Map<String, Value>, query: &Value) -> Result<bool, String> {
    let Some((kind, arg)) = query.as_object().and_then(|o| o.iter().next()) else {
        return Err("query must be an object".to_string());
    };
    match kind.as_str() {
        "match_all" => Ok(true),
        "match" => {
            let clauses = arg.as_object().ok_or("match expects an object")?;
            Ok(clauses.iter().all(|(field, text)| {
                let text = match text {
                    Value::Object(o) => o.get("query").and_then(Value::as_str).unwrap_or(""),
                    other => other.as_str().unwrap_or(""),
                };
                field_text(doc, field).is_some_and(|haystack| any_term(&haystack, text))
            }))
        }
        "query_string" => {
            let text = arg.as_str().ok_or("query_string expects a string")?;
            Ok(any_term(&all_text(doc), text))
        }
        "equals" => {
            let clauses = arg.as_object().ok_or("equals expects an object")?;
            Ok(clauses.iter().all(|(field, value)| doc.get(field) == Some(value)))
        }
        "bool" => {
            let must = arg
                .get("must")
                .and_then(Value::as_array)
                .ok_or("bool expects a must array")?;
            for clause in must {
                if !matches(doc, clause)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(format!("unknown query type '{other}'")),
    }
}

fn field_text(doc: &Map<String, Value>, field: &str) -> Option<String> {
    if field == "*" || field == "_all" {
        return Some(all_text(doc));
    }
    doc.get(field).and_then(Value::as_str).map(str::to_lowercase)
}

fn all_text(doc: &Map<String, Value>) -> String {
    doc.values()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn any_term(haystack: &str, text: &str) -> bool {
    let words: Vec<&str> = haystack.split(|c: char| !c.is_alphanumeric()).collect();
    text.split_whitespace()
        .map(str::to_lowercase)
        .any(|term| words.contains(&term.as_str()))
}
