//! In-memory stand-in for the search daemon's HTTP API.
//!
//! Tables are created on first insert. Stored documents are plain JSON
//! objects keyed by id; percolate tables are ordinary tables whose documents
//! carry a `query` field. Failures answer with `{"error": "..."}` the way the
//! real daemon does.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};

pub mod query;

use query::matches;

#[derive(Debug, Default)]
pub struct Store {
    tables: BTreeMap<String, BTreeMap<u64, Map<String, Value>>>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, String);
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub index: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub doc: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub index: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PartialUpdate {
    #[serde(default)]
    pub doc: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SqlParams {
    pub raw_response: Option<bool>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/insert", post(insert))
        .route("/replace", post(replace))
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route("/bulk", post(bulk))
        .route("/search", post(search))
        .route("/sql", post(sql))
        .route("/pq/{index}/search", post(percolate))
        .route("/{index}/_update/{id}", post(update_partial))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn reply(result: Result<Value, Failure>) -> Reply {
    result.map(Json).map_err(|(status, message)| {
        warn!(status = status.as_u16(), %message, "request rejected");
        (status, Json(json!({ "error": message })))
    })
}

fn unknown_table(index: &str, request: &str) -> Failure {
    (
        StatusCode::CONFLICT,
        format!("unknown local table(s) '{index}' in {request} request"),
    )
}

impl Store {
    fn table(&self, index: &str, request: &str) -> Result<&BTreeMap<u64, Map<String, Value>>, Failure> {
        self.tables.get(index).ok_or_else(|| unknown_table(index, request))
    }

    fn assign_id(&mut self, id: Option<u64>) -> u64 {
        match id {
            Some(id) if id != 0 => {
                self.next_id = self.next_id.max(id);
                id
            }
            _ => {
                self.next_id += 1;
                self.next_id
            }
        }
    }

    fn insert(&mut self, req: DocumentRequest) -> Result<Value, Failure> {
        if self
            .tables
            .get(&req.index)
            .is_some_and(|t| req.id.is_some_and(|id| t.contains_key(&id)))
        {
            let id = req.id.unwrap_or_default();
            return Err((StatusCode::CONFLICT, format!("duplicate id '{id}'")));
        }
        let id = self.assign_id(req.id);
        self.tables.entry(req.index.clone()).or_default().insert(id, req.doc);
        Ok(json!({"_index": req.index, "_id": id, "created": true, "result": "created", "status": 201}))
    }

    fn replace(&mut self, req: DocumentRequest) -> Result<Value, Failure> {
        let id = self.assign_id(req.id);
        let previous = self.tables.entry(req.index.clone()).or_default().insert(id, req.doc);
        let (result, status) = if previous.is_some() {
            ("updated", 200)
        } else {
            ("created", 201)
        };
        Ok(json!({"_index": req.index, "_id": id, "created": previous.is_none(), "result": result, "status": status}))
    }

    fn update(&mut self, index: &str, id: u64, doc: Map<String, Value>) -> Result<Value, Failure> {
        self.table(index, "update")?;
        let updated = match self.tables.get_mut(index).and_then(|t| t.get_mut(&id)) {
            Some(stored) => {
                stored.extend(doc);
                true
            }
            None => false,
        };
        let result = if updated { "updated" } else { "noop" };
        Ok(json!({"_index": index, "_id": id, "result": result}))
    }

    fn delete(&mut self, req: DeleteRequest) -> Result<Value, Failure> {
        self.table(&req.index, "delete")?;
        let found = self
            .tables
            .get_mut(&req.index)
            .and_then(|t| t.remove(&req.id))
            .is_some();
        let result = if found { "deleted" } else { "not found" };
        Ok(json!({"_index": req.index, "_id": req.id, "found": found, "result": result}))
    }

    fn search(&self, req: &SearchRequest) -> Result<Value, Failure> {
        let table = self.table(&req.index, "search")?;
        let query = req.query.clone().unwrap_or_else(|| json!({"match_all": {}}));
        let mut hits = Vec::new();
        for (id, doc) in table {
            if matches(doc, &query).map_err(|e| (StatusCode::BAD_REQUEST, e))? {
                hits.push(json!({"_id": id, "_score": 1, "_source": doc}));
            }
        }
        let total = hits.len();
        let hits: Vec<Value> = hits
            .into_iter()
            .skip(req.offset.unwrap_or(0))
            .take(req.limit.unwrap_or(20))
            .collect();
        Ok(hits_envelope(total, hits))
    }

    fn percolate(&self, index: &str, req: &Value) -> Result<Value, Failure> {
        let table = self.table(index, "percolate")?;
        let document = req
            .pointer("/query/percolate/document")
            .and_then(Value::as_object)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, "no document in percolate request".to_string()))?;
        let mut hits = Vec::new();
        for (id, stored) in table {
            let Some(stored_query) = stored.get("query") else {
                continue;
            };
            if matches(document, stored_query).map_err(|e| (StatusCode::BAD_REQUEST, e))? {
                hits.push(json!({
                    "_id": id,
                    "_score": 1,
                    "_source": {"query": stored_query},
                    "fields": {"_percolator_document_slot": [1]},
                }));
            }
        }
        Ok(hits_envelope(hits.len(), hits))
    }

    fn bulk_item(&mut self, op: &Value) -> Value {
        let Some((action, payload)) = op.as_object().and_then(|o| o.iter().next()) else {
            return json!({"error": "bulk item must be an object with one action", "status": 400});
        };
        let outcome = match action.as_str() {
            "insert" | "create" => parse(payload).and_then(|req| self.insert(req)),
            "replace" | "index" => parse(payload).and_then(|req| self.replace(req)),
            "update" => parse::<DocumentRequest>(payload).and_then(|req| {
                let id = req.id.unwrap_or_default();
                self.update(&req.index, id, req.doc)
            }),
            "delete" => parse(payload).and_then(|req| self.delete(req)),
            other => Err((StatusCode::BAD_REQUEST, format!("unknown bulk action '{other}'"))),
        };
        let result = outcome.unwrap_or_else(|(status, message)| {
            json!({"error": message, "status": status.as_u16()})
        });
        let mut item = Map::new();
        item.insert(action.clone(), result);
        Value::Object(item)
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, Failure> {
    serde_json::from_value(value.clone()).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn hits_envelope(total: usize, hits: Vec<Value>) -> Value {
    json!({
        "took": 0,
        "timed_out": false,
        "hits": {"total": total, "total_relation": "eq", "hits": hits},
    })
}

async fn insert(State(db): State<Db>, Json(req): Json<DocumentRequest>) -> Reply {
    info!(index = %req.index, id = ?req.id, "insert");
    reply(db.write().await.insert(req))
}

async fn replace(State(db): State<Db>, Json(req): Json<DocumentRequest>) -> Reply {
    info!(index = %req.index, id = ?req.id, "replace");
    reply(db.write().await.replace(req))
}

async fn update(State(db): State<Db>, Json(req): Json<DocumentRequest>) -> Reply {
    info!(index = %req.index, id = ?req.id, "update");
    let Some(id) = req.id else {
        return reply(Err((StatusCode::BAD_REQUEST, "'id' property is required".to_string())));
    };
    reply(db.write().await.update(&req.index, id, req.doc))
}

async fn update_partial(
    State(db): State<Db>,
    Path((index, id)): Path<(String, u64)>,
    Json(req): Json<PartialUpdate>,
) -> Reply {
    info!(%index, id, "partial update");
    reply(db.write().await.update(&index, id, req.doc))
}

async fn delete(State(db): State<Db>, Json(req): Json<DeleteRequest>) -> Reply {
    info!(index = %req.index, id = req.id, "delete");
    reply(db.write().await.delete(req))
}

async fn bulk(State(db): State<Db>, Json(ops): Json<Vec<Value>>) -> Reply {
    info!(items = ops.len(), "bulk");
    let mut store = db.write().await;
    let items: Vec<Value> = ops.iter().map(|op| store.bulk_item(op)).collect();
    let errors = items
        .iter()
        .filter_map(|item| item.as_object().and_then(|o| o.values().next()))
        .any(|result| result.get("error").is_some());
    Ok(Json(json!({
        "items": items,
        "current_line": ops.len(),
        "skipped_lines": 0,
        "errors": errors,
    })))
}

async fn search(State(db): State<Db>, Json(req): Json<SearchRequest>) -> Reply {
    debug!(index = %req.index, query = ?req.query, "search");
    reply(db.read().await.search(&req))
}

async fn percolate(State(db): State<Db>, Path(index): Path<String>, Json(req): Json<Value>) -> Reply {
    debug!(%index, "percolate");
    reply(db.read().await.percolate(&index, &req))
}

async fn sql(State(db): State<Db>, Query(params): Query<SqlParams>, body: String) -> Reply {
    let mut raw_mode = false;
    let mut statement = String::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "mode" => raw_mode = value == "raw",
            "query" => statement = value.into_owned(),
            _ => {}
        }
    }
    debug!(%statement, raw_mode, raw_response = ?params.raw_response, "sql");
    reply(db.read().await.sql(statement.trim().trim_end_matches(';'), raw_mode))
}

impl Store {
    fn sql(&self, statement: &str, raw_mode: bool) -> Result<Value, Failure> {
        let words: Vec<&str> = statement.split_whitespace().collect();
        let upper: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
        let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

        match upper.as_slice() {
            ["SHOW", "TABLES"] if raw_mode => {
                let data: Vec<Value> = self
                    .tables
                    .keys()
                    .map(|name| json!({"Table": name, "Type": "rt"}))
                    .collect();
                Ok(result_set(
                    json!([{"Table": {"type": "string"}}, {"Type": {"type": "string"}}]),
                    data,
                ))
            }
            ["SELECT", "*", "FROM", _] => {
                let index = words[3];
                let table = self.table(index, "search")?;
                if raw_mode {
                    let data: Vec<Value> = table
                        .iter()
                        .map(|(id, doc)| {
                            let mut row = Map::new();
                            row.insert("id".to_string(), json!(id));
                            row.extend(doc.clone());
                            Value::Object(row)
                        })
                        .collect();
                    Ok(result_set(json!([{"id": {"type": "long long"}}]), data))
                } else {
                    let hits: Vec<Value> = table
                        .iter()
                        .map(|(id, doc)| json!({"_id": id, "_score": 1, "_source": doc}))
                        .collect();
                    Ok(hits_envelope(hits.len(), hits))
                }
            }
            [] => Err((StatusCode::BAD_REQUEST, "query missing".to_string())),
            _ if !raw_mode => Err((
                StatusCode::BAD_REQUEST,
                "only SELECT queries are supported".to_string(),
            )),
            _ => Err((
                StatusCode::BAD_REQUEST,
                format!("P01: syntax error, unexpected identifier near '{statement}'"),
            )),
        }
    }
}

fn result_set(columns: Value, data: Vec<Value>) -> Value {
    json!([{
        "columns": columns,
        "data": data,
        "total": data.len(),
        "error": "",
        "warning": "",
    }])
}
