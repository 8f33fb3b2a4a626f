//! HTTP routes over the catalog.
//!
//! `handle` maps one request to one `Reply` and never touches a socket,
//! which keeps routing testable. `serve` runs `handle` on a pool of worker
//! threads pulling from one shared `tiny_http` listener.
//!
//! Routes:
//! - `GET    /trees`               every record
//! - `GET    /trees/search/:term`  matching records, sorted by name
//! - `GET    /trees/:id`           one record, `{}` when absent
//! - `POST   /trees`               create, id possibly reassigned
//! - `DELETE /trees`               remove everything
//! - `DELETE /trees/:id`           remove one record
//! - `DELETE /trees/:origin`       remove by origin: `api`, `manual`, `all`
//!                                 (also `dataset`, `user`)

use std::io::Read;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};

use treestore_core::{tree_from_json, Scope, StoreError, TreeStore};

use crate::error::{ServiceError, ServiceResult};

/// Largest request body accepted, in bytes
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Status code and JSON body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, vec![format!("failed to encode response: {}", e)]),
        }
    }

    fn error(status: u16, messages: Vec<String>) -> Self {
        let reason = match status {
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        };
        Self {
            status,
            body: json!({ "statusCode": status, "error": reason, "message": messages }),
        }
    }
}

/// Route one request.
///
/// `url` may carry a query string, which is ignored.
pub fn handle(store: &TreeStore, method: &Method, url: &str, body: &str) -> Reply {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (Method::Get, ["trees"]) => Reply::json(200, &store.list()),
        (Method::Get, ["trees", "search", term]) => match urlencoding::decode(term) {
            Ok(term) => Reply::json(200, &store.search(&term)),
            Err(e) => Reply::error(400, vec![format!("invalid search term: {}", e)]),
        },
        (Method::Get, ["trees", id]) => match parse_id(id) {
            // Absence is masked as an empty object
            Ok(id) => match store.get(id) {
                Some(tree) => Reply::json(200, &tree),
                None => Reply::json(200, &json!({})),
            },
            Err(reply) => reply,
        },
        (Method::Post, ["trees"]) => create(store, body),
        (Method::Delete, ["trees"]) => purge(store, Scope::All),
        (Method::Delete, ["trees", target]) => match target.parse::<u64>() {
            Ok(id) => Reply::json(200, &json!({ "deleted": store.delete(id) })),
            Err(_) => match store.delete_by_origin(target) {
                Ok(removed) => Reply::json(200, &json!({ "removed": removed })),
                Err(e) => Reply::error(400, vec![e.to_string()]),
            },
        },
        (_, ["trees"]) | (_, ["trees", _]) | (_, ["trees", "search", _]) => {
            Reply::error(405, vec![format!("{} not allowed on {}", method, path)])
        }
        _ => Reply::error(404, vec![format!("Cannot {} {}", method, path)]),
    }
}

fn parse_id(raw: &str) -> Result<u64, Reply> {
    raw.parse::<u64>().map_err(|_| {
        Reply::error(400, vec![format!("Validation failed (numeric string is expected): {}", raw)])
    })
}

fn create(store: &TreeStore, body: &str) -> Reply {
    let payload: Value = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => return Reply::error(400, vec![format!("invalid JSON body: {}", e)]),
    };

    match tree_from_json(&payload) {
        Ok(tree) => {
            let mut stored = tree.clone();
            stored.id = store.insert_assigning_id(tree);
            Reply::json(201, &stored)
        }
        Err(StoreError::Validation(messages)) => Reply::error(400, messages),
        Err(e) => Reply::error(400, vec![e.to_string()]),
    }
}

fn purge(store: &TreeStore, scope: Scope) -> Reply {
    let removed = store.purge(scope);
    Reply::json(200, &json!({ "removed": removed }))
}

/// Bind the HTTP listener.
pub fn bind(addr: &str) -> ServiceResult<Server> {
    Server::http(addr).map_err(|e| ServiceError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })
}

/// Serve requests on `workers` threads until the listener closes.
pub fn serve(server: Arc<Server>, store: Arc<TreeStore>, workers: usize) -> ServiceResult<()> {
    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let server = Arc::clone(&server);
        let store = Arc::clone(&store);
        let handle = thread::Builder::new()
            .name(format!("treestore-http-{}", i))
            .spawn(move || {
                for request in server.incoming_requests() {
                    respond(&store, request);
                }
            })?;
        handles.push(handle);
    }
    info!(workers, "http workers started");

    for handle in handles {
        if handle.join().is_err() {
            error!("http worker panicked");
        }
    }
    Ok(())
}

/// Read a request body of at most [`MAX_BODY_BYTES`].
fn read_body<R: Read>(reader: R) -> Result<String, Reply> {
    let mut body = String::new();
    reader
        .take(MAX_BODY_BYTES + 1)
        .read_to_string(&mut body)
        .map_err(|e| Reply::error(400, vec![format!("unreadable request body: {}", e)]))?;
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(Reply::error(
            413,
            vec![format!("request body exceeds {} bytes", MAX_BODY_BYTES)],
        ));
    }
    Ok(body)
}

fn respond(store: &TreeStore, mut request: Request) {
    let reply = match read_body(request.as_reader()) {
        Ok(body) => handle(store, request.method(), request.url(), &body),
        Err(reply) => reply,
    };
    debug!(method = %request.method(), url = request.url(), status = reply.status, "handled request");

    let mut response = Response::from_string(reply.body.to_string()).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json; charset=utf-8"[..]) {
        response.add_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treestore_core::Tree;

    fn store() -> TreeStore {
        let store = TreeStore::new();
        for (id, name) in [(10, "Marronnier"), (20, "Cèdre"), (30, "Platane")] {
            store.insert_with_id(Tree::named(name).with_id(id));
        }
        store
    }

    #[test]
    fn test_get_missing_is_empty_object() {
        let reply = handle(&store(), &Method::Get, "/trees/40", "");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, json!({}));
    }

    #[test]
    fn test_get_non_numeric_id() {
        let reply = handle(&store(), &Method::Get, "/trees/abc", "");
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_query_string_ignored() {
        let reply = handle(&store(), &Method::Get, "/trees?limit=1", "");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_search_decodes_term() {
        let reply = handle(&store(), &Method::Get, "/trees/search/C%C3%A8dre", "");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body[0]["id"], 20);
    }

    #[test]
    fn test_unknown_routes() {
        assert_eq!(handle(&store(), &Method::Get, "/forests", "").status, 404);
        assert_eq!(handle(&store(), &Method::Put, "/trees/10", "").status, 405);
    }

    #[test]
    fn test_delete_by_origin_names() {
        let store = store();
        store.insert_with_id(Tree::named("Noyer").with_id(3));

        let reply = handle(&store, &Method::Delete, "/trees/dataset", "");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["removed"], 3);

        let reply = handle(&store, &Method::Delete, "/trees/all", "");
        assert_eq!(reply.body["removed"], 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_unknown_origin() {
        let store = store();
        let reply = handle(&store, &Method::Delete, "/trees/garden", "");
        assert_eq!(reply.status, 400);
        assert!(reply.body["message"][0].as_str().unwrap().contains("'garden'"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_body_size_limit() {
        assert_eq!(read_body(&b"{\"name\": \"If\"}"[..]).unwrap(), "{\"name\": \"If\"}");

        let exact = vec![b' '; MAX_BODY_BYTES as usize];
        assert!(read_body(&exact[..]).is_ok());

        let oversized = vec![b' '; MAX_BODY_BYTES as usize + 1];
        let reply = read_body(&oversized[..]).unwrap_err();
        assert_eq!(reply.status, 413);
        assert_eq!(reply.body["error"], "Payload Too Large");
    }

    #[test]
    fn test_create_bad_json() {
        let reply = handle(&store(), &Method::Post, "/trees", "{not json");
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["statusCode"], 400);
    }
}
