//! Cursor session affinity
//!
//! The server binds a cursor to the logical session of the command that
//! opened it and rejects `getMore`/`killCursors` sent under any other
//! session. [`CursorSessions`] keeps the opening session of every live cursor
//! so follow-up commands run under it. Each session sits behind its own lock,
//! so different cursors never wait on one another.

use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::{Bson, Document};
use tokio::sync::Mutex;

/// How a command relates to server cursors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRoute {
    /// May open a cursor; runs under a fresh explicit session
    Opens,

    /// Continues or kills the listed cursors; runs under their session
    Pinned(Vec<i64>),

    /// No cursor involvement
    Unpinned,
}

impl SessionRoute {
    /// Classify a command document by its name
    pub fn of(command: &Document) -> Self {
        match super::command_name(command) {
            "find" | "aggregate" => SessionRoute::Opens,
            "getMore" => SessionRoute::Pinned(
                command.get("getMore").and_then(cursor_id_value).into_iter().collect(),
            ),
            "killCursors" => SessionRoute::Pinned(
                command
                    .get_array("cursors")
                    .map(|ids| ids.iter().filter_map(cursor_id_value).collect())
                    .unwrap_or_default(),
            ),
            _ => SessionRoute::Unpinned,
        }
    }
}

/// Cursor id in a `find`/`getMore` response, if any
pub fn response_cursor_id(response: &Document) -> Option<i64> {
    response
        .get_document("cursor")
        .ok()
        .and_then(|cursor| cursor.get("id"))
        .and_then(cursor_id_value)
}

fn cursor_id_value(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int64(id) => Some(*id),
        Bson::Int32(id) => Some(i64::from(*id)),
        _ => None,
    }
}

/// Sessions of live cursors, keyed by database and cursor id
pub struct CursorSessions<S> {
    sessions: Mutex<HashMap<(String, i64), Arc<Mutex<S>>>>,
}

impl<S> CursorSessions<S> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Remember the session that opened cursor `id`
    pub async fn register(&self, database: &str, id: i64, session: S) {
        self.sessions
            .lock()
            .await
            .insert((database.to_string(), id), Arc::new(Mutex::new(session)));
    }

    /// Session of cursor `id`, if it was registered and not yet released
    pub async fn get(&self, database: &str, id: i64) -> Option<Arc<Mutex<S>>> {
        self.sessions
            .lock()
            .await
            .get(&(database.to_string(), id))
            .cloned()
    }

    /// Forget cursor `id`; its session ends once the last holder drops it
    pub async fn release(&self, database: &str, id: i64) {
        self.sessions
            .lock()
            .await
            .remove(&(database.to_string(), id));
    }

    /// Keep `session` for the cursor a cursor-opening command returned
    ///
    /// Returns whether the session was kept; it is dropped when the response
    /// holds no live cursor.
    pub async fn pin(&self, database: &str, response: &Document, session: S) -> bool {
        match response_cursor_id(response).filter(|id| *id != 0) {
            Some(id) => {
                self.register(database, id, session).await;
                true
            }
            None => false,
        }
    }

    /// Release cursors a pinned command ended
    ///
    /// `killCursors` ends every listed cursor; a `getMore` ends its cursor
    /// when the server answers with id 0.
    pub async fn settle(&self, database: &str, command: &Document, ids: &[i64], response: &Document) {
        let killed = super::command_name(command) == "killCursors";
        if killed || response_cursor_id(response) == Some(0) {
            for &id in ids {
                self.release(database, id).await;
            }
        }
    }

    /// Forget every cursor; returns how many were held
    pub async fn clear(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// Number of cursors holding a session
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<S> Default for CursorSessions<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command;
    use crate::config::CursorConfig;
    use crate::cursor::CursorId;
    use crate::options::FindOptions;
    use mongodb::bson::doc;

    #[test]
    fn test_routes() {
        let find = command::find("orders", None, &FindOptions::default(), &CursorConfig::default())
            .unwrap();
        assert_eq!(SessionRoute::of(&find), SessionRoute::Opens);

        let get_more = command::get_more(CursorId::new(42), "orders", None).unwrap();
        assert_eq!(SessionRoute::of(&get_more), SessionRoute::Pinned(vec![42]));

        let kill = command::kill_cursors("orders", &[CursorId::new(42), CursorId::new(7)]);
        assert_eq!(SessionRoute::of(&kill), SessionRoute::Pinned(vec![42, 7]));

        let insert = doc! { "insert": "orders", "documents": [] };
        assert_eq!(SessionRoute::of(&insert), SessionRoute::Unpinned);
    }

    #[test]
    fn test_response_cursor_id() {
        let response = doc! { "cursor": { "id": 42i64, "ns": "shop.orders", "firstBatch": [] } };
        assert_eq!(response_cursor_id(&response), Some(42));
        assert_eq!(response_cursor_id(&doc! { "n": 1 }), None);
    }

    #[tokio::test]
    async fn test_find_and_get_more_share_a_session() {
        let sessions = CursorSessions::new();

        let find_reply = doc! { "cursor": { "firstBatch": [{ "_id": 1 }], "id": 42i64, "ns": "shop.orders" }, "ok": 1 };
        assert!(sessions.pin("shop", &find_reply, "find-session").await);

        let get_more = command::get_more(CursorId::new(42), "orders", None).unwrap();
        let SessionRoute::Pinned(ids) = SessionRoute::of(&get_more) else {
            panic!("getMore must be pinned");
        };
        let pinned = sessions.get("shop", ids[0]).await.unwrap();
        assert_eq!(*pinned.lock().await, "find-session");

        // a batch with the cursor still open keeps the session
        let more = doc! { "cursor": { "nextBatch": [{ "_id": 2 }], "id": 42i64, "ns": "shop.orders" }, "ok": 1 };
        sessions.settle("shop", &get_more, &ids, &more).await;
        assert!(sessions.get("shop", 42).await.is_some());

        // the last batch ends it
        let last = doc! { "cursor": { "nextBatch": [], "id": 0i64, "ns": "shop.orders" }, "ok": 1 };
        sessions.settle("shop", &get_more, &ids, &last).await;
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_exhausted_find_is_not_pinned() {
        let sessions = CursorSessions::new();
        let reply = doc! { "cursor": { "firstBatch": [], "id": 0i64, "ns": "shop.orders" }, "ok": 1 };

        assert!(!sessions.pin("shop", &reply, ()).await);
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_kill_cursors_releases_session() {
        let sessions = CursorSessions::new();
        sessions.register("shop", 42, ()).await;

        let kill = command::kill_cursors("orders", &[CursorId::new(42)]);
        let SessionRoute::Pinned(ids) = SessionRoute::of(&kill) else {
            panic!("killCursors must be pinned");
        };
        assert!(sessions.get("shop", 42).await.is_some());

        sessions.settle("shop", &kill, &ids, &doc! { "cursorsKilled": [42i64], "ok": 1 }).await;
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_more_runs_under_opening_session() {
        let sessions = CursorSessions::new();

        // two finds open cursors under their own sessions
        sessions.register("shop", 11, "session-a").await;
        sessions.register("shop", 22, "session-b").await;

        let SessionRoute::Pinned(ids) = SessionRoute::of(&doc! { "getMore": 22i64, "collection": "orders" })
        else {
            panic!("getMore must be pinned");
        };
        let pinned = sessions.get("shop", ids[0]).await.unwrap();
        assert_eq!(*pinned.lock().await, "session-b");

        let pinned = sessions.get("shop", 11).await.unwrap();
        assert_eq!(*pinned.lock().await, "session-a");
    }

    #[tokio::test]
    async fn test_sessions_are_independent_per_cursor() {
        let sessions = CursorSessions::new();
        sessions.register("shop", 11, 1u32).await;
        sessions.register("shop", 22, 2u32).await;

        let first = sessions.get("shop", 11).await.unwrap();
        let _held = first.lock().await;

        // another cursor's session stays available while the first is in use
        let second = sessions.get("shop", 22).await.unwrap();
        assert_eq!(*second.try_lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_release_and_database_scoping() {
        let sessions = CursorSessions::new();
        sessions.register("shop", 11, ()).await;

        assert!(sessions.get("other", 11).await.is_none());
        assert_eq!(sessions.len().await, 1);

        sessions.release("shop", 11).await;
        assert!(sessions.get("shop", 11).await.is_none());
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_drops_every_session() {
        let sessions = CursorSessions::new();
        sessions.register("shop", 1, ()).await;
        sessions.register("audit", 2, ()).await;

        assert_eq!(sessions.clear().await, 2);
        assert!(sessions.is_empty().await);
    }
}
