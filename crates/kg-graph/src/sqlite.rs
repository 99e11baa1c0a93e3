//! SQLite-backed graph store.

use crate::config::{GraphStoreConfig, SqliteGraphConfig};
use crate::graph::MemoryGraph;
use crate::store::{ExploreOptions, GraphStore, GraphStoreError};
use crate::traversal::{bounded_search, interleave_unique, Neighborhood};
use async_trait::async_trait;
use kg_types::{props, Direction, Edge, Elem, PropertyValue, Props, Vertex};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::sync::Mutex;

/// Graph store persisting vertices and edges in SQLite.
///
/// Several graphs may share one database file; every row carries its graph name. Edge
/// properties are stored as canonical JSON (sorted keys), so the unique key on
/// `(graph, sid, tid, props)` gives the same value-based dedup as `MemoryGraph`.
pub struct SqliteGraphStore {
    config: GraphStoreConfig,
    conn: Mutex<Connection>,
    schema_cache: Mutex<Option<String>>,
}

impl SqliteGraphStore {
    pub fn new(config: SqliteGraphConfig) -> Result<Self, GraphStoreError> {
        let path = config.path.clone();
        let config = GraphStoreConfig::Sqlite(config);
        config.validate()?;

        let backend_err = |e: rusqlite::Error| GraphStoreError::Backend {
            operation: "open",
            graph: config.name().to_string(),
            message: e.to_string(),
        };
        let conn = Connection::open(&path).map_err(backend_err)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vertices (
                graph TEXT NOT NULL,
                id TEXT NOT NULL,
                props TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (graph, id)
            );

            CREATE TABLE IF NOT EXISTS edges (
                graph TEXT NOT NULL,
                sid TEXT NOT NULL,
                tid TEXT NOT NULL,
                props TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (graph, sid, tid, props)
            );

            CREATE INDEX IF NOT EXISTS idx_edges_sid ON edges(graph, sid);
            CREATE INDEX IF NOT EXISTS idx_edges_tid ON edges(graph, tid);
            "#,
        )
        .map_err(backend_err)?;

        tracing::debug!(graph = config.name(), path = %path.display(), "sqlite graph store opened");
        Ok(Self {
            config,
            conn: Mutex::new(conn),
            schema_cache: Mutex::new(None),
        })
    }

    fn graph_name(&self) -> &str {
        self.config.name()
    }

    fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.conn.lock().map_err(|e| GraphStoreError::Backend {
            operation,
            graph: self.graph_name().to_string(),
            message: format!("failed to acquire lock: {}", e),
        })?;
        f(&conn).map_err(|e| GraphStoreError::Backend {
            operation,
            graph: self.graph_name().to_string(),
            message: e.to_string(),
        })
    }

    /// Called with the connection locked; `get_schema` fills the cache under the same lock.
    fn invalidate_schema(&self) {
        if let Ok(mut cache) = self.schema_cache.lock() {
            cache.take();
        }
    }

}

fn read_full_graph(conn: &Connection, graph: &str) -> Result<MemoryGraph, rusqlite::Error> {
    let mut result = MemoryGraph::new();
    let mut stmt = conn.prepare("SELECT id, props FROM vertices WHERE graph = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map([graph], |row| {
        let id: String = row.get(0)?;
        let props = parse_props(1, &row.get::<_, String>(1)?)?;
        Vertex::new(id)
            .map(|v| v.with_props(props))
            .map_err(|e| conversion_error(0, e))
    })?;
    for vertex in rows {
        result.upsert_vertex(vertex?);
    }

    let mut stmt =
        conn.prepare("SELECT sid, tid, props FROM edges WHERE graph = ?1 ORDER BY rowid")?;
    let rows = stmt.query_map([graph], edge_from_row)?;
    for edge in rows {
        result.append_edge(edge?);
    }
    Ok(result)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_props(idx: usize, json: &str) -> Result<Props, rusqlite::Error> {
    serde_json::from_str(json).map_err(|e| conversion_error(idx, e))
}

fn props_json(props: &Props) -> Result<String, rusqlite::Error> {
    serde_json::to_string(props).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Maps a `(sid, tid, props)` row.
fn edge_from_row(row: &rusqlite::Row<'_>) -> Result<Edge, rusqlite::Error> {
    let sid: String = row.get(0)?;
    let tid: String = row.get(1)?;
    let props = parse_props(2, &row.get::<_, String>(2)?)?;
    Edge::new(sid, tid)
        .map(|e| e.with_props(props))
        .map_err(|e| conversion_error(0, e))
}

/// JSON has no NaN or infinity; such values would come back as `null` and poison reads.
fn ensure_storable(props: &Props) -> Result<(), GraphStoreError> {
    for (key, value) in props {
        if let PropertyValue::Float(f) = value {
            if !f.is_finite() {
                return Err(GraphStoreError::InvalidArgument(format!(
                    "property {} holds non-finite float {}",
                    key, f
                )));
            }
        }
    }
    Ok(())
}

fn sql_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(b) => Value::Integer(*b as i64),
        PropertyValue::Integer(i) => Value::Integer(*i),
        PropertyValue::Float(f) => Value::Real(*f),
        PropertyValue::String(s) => Value::Text(s.clone()),
        PropertyValue::Bytes(b) => Value::Blob(b.clone()),
    }
}

fn ensure_vertex(conn: &Connection, graph: &str, vid: &str, ts: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO vertices (graph, id, props, updated_at) VALUES (?1, ?2, '{}', ?3)",
        params![graph, vid, ts],
    )?;
    Ok(())
}

fn insert_edge(conn: &Connection, graph: &str, edge: &Edge, ts: &str) -> Result<bool, rusqlite::Error> {
    ensure_vertex(conn, graph, edge.sid(), ts)?;
    ensure_vertex(conn, graph, edge.tid(), ts)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO edges (graph, sid, tid, props, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![graph, edge.sid(), edge.tid(), props_json(edge.props())?, ts],
    )?;
    Ok(changed > 0)
}

/// Read view over one graph inside a locked connection.
struct SqliteView<'a> {
    conn: &'a Connection,
    graph: &'a str,
}

impl SqliteView<'_> {
    fn edges_where(
        &self,
        column: &str,
        vid: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>, rusqlite::Error> {
        let sql = format!(
            "SELECT sid, tid, props FROM edges WHERE graph = ?1 AND {} = ?2 ORDER BY rowid LIMIT ?3",
            column
        );
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let edges = stmt
            .query_map(params![self.graph, vid, limit], edge_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }
}

impl Neighborhood for SqliteView<'_> {
    type Error = rusqlite::Error;

    fn vertex(&self, vid: &str) -> Result<Option<Vertex>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT props FROM vertices WHERE graph = ?1 AND id = ?2")?;
        let props: Option<String> = stmt
            .query_row(params![self.graph, vid], |row| row.get(0))
            .optional()?;
        match props {
            Some(json) => {
                let props = parse_props(0, &json)?;
                let vertex = Vertex::new(vid).map_err(|e| conversion_error(0, e))?;
                Ok(Some(vertex.with_props(props)))
            }
            None => Ok(None),
        }
    }

    fn neighbor_edges(
        &self,
        vid: &str,
        direction: Direction,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>, rusqlite::Error> {
        match direction {
            Direction::Out => self.edges_where("sid", vid, limit),
            Direction::In => self.edges_where("tid", vid, limit),
            Direction::Both => Ok(interleave_unique(
                self.edges_where("sid", vid, None)?,
                self.edges_where("tid", vid, None)?,
                limit,
            )),
        }
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    fn config(&self) -> &GraphStoreConfig {
        &self.config
    }

    async fn insert_triplet(
        &self,
        sub: &str,
        rel: &str,
        obj: &str,
    ) -> Result<(), GraphStoreError> {
        let edge = Edge::new(sub, obj)?.with_prop(self.config.edge_label(), rel);
        let graph = self.graph_name();
        let ts = now();
        self.with_conn("insert_triplet", |conn| {
            if insert_edge(conn, graph, &edge, &ts)? {
                self.invalidate_schema();
            }
            Ok(())
        })
    }

    async fn insert_graph(&self, graph: &MemoryGraph) -> Result<(), GraphStoreError> {
        for vertex in graph.vertices() {
            ensure_storable(vertex.props())?;
        }
        for edge in graph.edges() {
            ensure_storable(edge.props())?;
        }
        let name = self.graph_name();
        let ts = now();
        self.with_conn("insert_graph", |conn| {
            let tx = conn.unchecked_transaction()?;
            for vertex in graph.vertices() {
                if vertex.props().is_empty() {
                    ensure_vertex(&tx, name, vertex.vid(), &ts)?;
                } else {
                    tx.execute(
                        "INSERT INTO vertices (graph, id, props, updated_at) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(graph, id) DO UPDATE SET props = excluded.props, updated_at = excluded.updated_at",
                        params![name, vertex.vid(), props_json(vertex.props())?, ts],
                    )?;
                }
            }
            for edge in graph.edges() {
                insert_edge(&tx, name, edge, &ts)?;
            }
            tx.commit()?;
            self.invalidate_schema();
            Ok(())
        })
    }

    async fn get_triplets(&self, sub: &str) -> Result<Vec<(String, String)>, GraphStoreError> {
        let graph = self.graph_name();
        let edges = self.with_conn("get_triplets", |conn| {
            SqliteView { conn, graph }.neighbor_edges(sub, Direction::Out, None)
        })?;
        let label = self.config.edge_label();
        let mut triplets = Vec::with_capacity(edges.len());
        for edge in &edges {
            let triplet = edge.triplet(Some(label)).or_else(|_| edge.triplet(None))?;
            triplets.push((triplet.rel, triplet.obj));
        }
        Ok(triplets)
    }

    async fn delete_triplet(
        &self,
        sub: &str,
        rel: &str,
        obj: &str,
    ) -> Result<(), GraphStoreError> {
        let graph = self.graph_name();
        let expected = props([(self.config.edge_label(), rel)]);
        self.with_conn("delete_triplet", |conn| {
            let mut stmt = conn.prepare(
                "SELECT rowid, sid, tid, props FROM edges WHERE graph = ?1 AND sid = ?2 AND tid = ?3",
            )?;
            let candidates = stmt
                .query_map(params![graph, sub, obj], |row| {
                    let rowid: i64 = row.get(0)?;
                    let sid: String = row.get(1)?;
                    let tid: String = row.get(2)?;
                    let props = parse_props(3, &row.get::<_, String>(3)?)?;
                    let edge = Edge::new(sid, tid)
                        .map(|e| e.with_props(props))
                        .map_err(|e| conversion_error(0, e))?;
                    Ok((rowid, edge))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            let mut removed = 0;
            for (rowid, edge) in candidates {
                if edge.has_props(&expected) {
                    removed += conn.execute("DELETE FROM edges WHERE rowid = ?1", [rowid])?;
                }
            }
            if removed > 0 {
                self.invalidate_schema();
            }
            Ok(())
        })
    }

    async fn truncate(&self) -> Result<(), GraphStoreError> {
        let graph = self.graph_name();
        self.with_conn("truncate", |conn| {
            conn.execute("DELETE FROM edges WHERE graph = ?1", [graph])?;
            conn.execute("DELETE FROM vertices WHERE graph = ?1", [graph])?;
            self.invalidate_schema();
            Ok(())
        })
    }

    async fn drop_graph(&self) -> Result<(), GraphStoreError> {
        tracing::debug!(graph = self.graph_name(), "dropping sqlite graph");
        self.truncate().await
    }

    async fn get_schema(&self, refresh: bool) -> Result<String, GraphStoreError> {
        if !refresh {
            if let Some(cached) = self.schema_cache.lock().ok().and_then(|c| c.clone()) {
                return Ok(cached);
            }
        }
        let graph = self.graph_name();
        self.with_conn("get_schema", |conn| {
            let schema = read_full_graph(conn, graph)?.schema().to_string();
            if let Ok(mut cache) = self.schema_cache.lock() {
                *cache = Some(schema.clone());
            }
            Ok(schema)
        })
    }

    async fn get_full_graph(&self) -> Result<MemoryGraph, GraphStoreError> {
        let graph = self.graph_name();
        self.with_conn("get_full_graph", |conn| read_full_graph(conn, graph))
    }

    async fn explore(
        &self,
        subs: &[String],
        options: &ExploreOptions,
    ) -> Result<MemoryGraph, GraphStoreError> {
        tracing::debug!(
            graph = self.graph_name(),
            seeds = subs.len(),
            direction = %options.direction,
            "explore"
        );
        let graph = self.graph_name();
        self.with_conn("explore", |conn| {
            bounded_search(
                &SqliteView { conn, graph },
                subs,
                options.direction,
                options.depth,
                options.fan,
                options.limit,
            )
        })
    }

    /// Runs a read-only `SELECT` whose first three columns are `sid`, `tid` and the JSON
    /// edge properties. `params` bind to `:name` placeholders.
    async fn query(&self, query: &str, params: &Props) -> Result<MemoryGraph, GraphStoreError> {
        if !query.trim_start().to_ascii_lowercase().starts_with("select") {
            tracing::warn!(graph = self.graph_name(), "rejected non-select query");
            return Err(GraphStoreError::InvalidArgument(
                "sqlite graph store only runs SELECT queries".to_string(),
            ));
        }
        let graph = self.graph_name();
        let bound: Vec<(String, Value)> = params
            .iter()
            .map(|(k, v)| (format!(":{}", k), sql_value(v)))
            .collect();
        self.with_conn("query", |conn| {
            let mut stmt = conn.prepare(query)?;
            if stmt.column_count() < 3 {
                return Err(rusqlite::Error::InvalidColumnIndex(2));
            }
            let named: Vec<(&str, &dyn ToSql)> = bound
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn ToSql))
                .collect();
            let edges = stmt
                .query_map(named.as_slice(), edge_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let view = SqliteView { conn, graph };
            let mut result = MemoryGraph::new();
            for edge in edges {
                for vid in [edge.sid(), edge.tid()] {
                    if !result.has_vertex(vid) {
                        if let Some(vertex) = view.vertex(vid)? {
                            result.upsert_vertex(vertex);
                        }
                    }
                }
                result.append_edge(edge);
            }
            Ok(result)
        })
    }
}
