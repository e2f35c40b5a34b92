//! Firebase Realtime Database adapter.
//!
//! Talks to the database's REST interface. Records live under
//! `/<collection>/<id>` and partitions are selected with an
//! `orderBy`/`equalTo` query on the partition field. Live feeds use the
//! REST streaming endpoint and re-read the filtered partition whenever the
//! server reports a change, so every delivery is a full snapshot.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use tokio::time::timeout;
use url::Url;

use super::sse::SseParser;
use super::{RemoteStore, SnapshotSink, Subscription};
use crate::constants::{CREATED_AT_FIELD, REQUEST_TIMEOUT};
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::PartitionKey;
use crate::record::{Collection, Fields, NewRecord, RecordId, StoredRecord};

#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

fn unavailable(e: impl std::fmt::Display) -> ShiftboardError {
    ShiftboardError::StoreUnavailable(e.to_string())
}

/// Characters the database refuses in keys. `/` and `.` would also let a key
/// walk out of its collection once it is joined into a URL.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Reject anything that is not a single, plain path segment.
fn check_key(what: &str, key: &str) -> ShiftboardResult<()> {
    if key.is_empty() {
        return Err(ShiftboardError::InvalidInput(format!("{what} cannot be empty")));
    }
    if key
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_KEY_CHARS.contains(&c))
    {
        return Err(ShiftboardError::InvalidInput(format!(
            "{what} '{key}' may not contain control characters or any of / . # $ [ ]"
        )));
    }
    Ok(())
}

/// What the live feed does with one server event.
#[derive(Debug, PartialEq, Eq)]
enum FeedAction {
    /// The partition changed; read it again.
    Refetch,
    Ignore,
    /// The server ended the feed.
    Fail(&'static str),
}

fn feed_action(event: &str) -> FeedAction {
    match event {
        "put" | "patch" => FeedAction::Refetch,
        "cancel" => FeedAction::Fail("feed cancelled by the server"),
        "auth_revoked" => FeedAction::Fail("auth token revoked"),
        _ => FeedAction::Ignore,
    }
}

/// A record that reads back as `null` does not exist.
fn ensure_exists(current: &Value, id: &RecordId) -> ShiftboardResult<()> {
    if current.is_null() {
        return Err(ShiftboardError::NotFound(id.to_string()));
    }
    Ok(())
}

/// Strip the fields an update may never move: the partition and creation time.
fn update_body(collection: &Collection, mut patch: Fields) -> Fields {
    patch.remove(collection.partition_field);
    patch.remove(CREATED_AT_FIELD);
    patch
}

impl FirebaseStore {
    pub fn new(database_url: &str, auth_token: Option<String>) -> ShiftboardResult<Self> {
        let mut base = Url::parse(database_url).map_err(|e| {
            ShiftboardError::Config(format!("Invalid database_url '{database_url}': {e}"))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(FirebaseStore {
            client: Client::new(),
            base,
            auth_token: auth_token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> ShiftboardResult<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ShiftboardError::Config(format!("Invalid path '{path}': {e}")))?;
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    fn collection_url(&self, collection: &Collection) -> ShiftboardResult<Url> {
        check_key("collection name", &collection.name)?;
        self.url(&format!("{}.json", collection.name))
    }

    fn record_url(&self, collection: &Collection, id: &RecordId) -> ShiftboardResult<Url> {
        check_key("collection name", &collection.name)?;
        check_key("record id", id.as_str())?;
        self.url(&format!("{}/{}.json", collection.name, id))
    }

    /// Collection URL filtered to one partition.
    fn partition_url(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
    ) -> ShiftboardResult<Url> {
        let mut url = self.collection_url(collection)?;
        let order_by = serde_json::to_string(collection.partition_field)?;
        let equal_to = serde_json::to_string(partition.as_str())?;
        url.query_pairs_mut()
            .append_pair("orderBy", &order_by)
            .append_pair("equalTo", &equal_to);
        Ok(url)
    }

    /// Send one request and decode its JSON body, bounded by the request timeout.
    async fn call(&self, request: RequestBuilder) -> ShiftboardResult<Value> {
        let exchange = async {
            let response = request.send().await.map_err(unavailable)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(unavailable(format!("{status}: {body}")));
            }
            response.json::<Value>().await.map_err(unavailable)
        };

        timeout(REQUEST_TIMEOUT, exchange).await.map_err(|_| {
            unavailable(format!(
                "request timed out after {}s",
                REQUEST_TIMEOUT.as_secs()
            ))
        })?
    }

    async fn fetch_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
    ) -> ShiftboardResult<Vec<StoredRecord>> {
        let url = self.partition_url(collection, partition)?;
        let value = self.call(self.client.get(url)).await?;
        Ok(parse_snapshot(value))
    }

    /// Apply a multi-location update rooted at the collection.
    async fn patch_collection(&self, collection: &Collection, body: Fields) -> ShiftboardResult<()> {
        if body.is_empty() {
            return Ok(());
        }
        let url = self.collection_url(collection)?;
        self.call(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn watch(self, collection: Collection, partition: PartitionKey, sink: SnapshotSink) {
        if let Err(e) = self.stream(&collection, &partition, &sink).await {
            tracing::warn!(
                collection = %collection.name,
                %partition,
                "live feed unavailable: {e}"
            );
            sink.unavailable(e.to_string());
        }
    }

    async fn stream(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        sink: &SnapshotSink,
    ) -> ShiftboardResult<()> {
        let url = self.partition_url(collection, partition)?;
        let request = self.client.get(url).header(ACCEPT, "text/event-stream");

        let mut response = timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| unavailable("timed out opening live feed"))?
            .map_err(unavailable)?;
        if !response.status().is_success() {
            return Err(unavailable(format!("live feed refused: {}", response.status())));
        }

        let mut parser = SseParser::new();
        while let Some(chunk) = response.chunk().await.map_err(unavailable)? {
            for event in parser.feed(&chunk) {
                tracing::trace!(event = %event.event, data = %event.data, "feed event");
                match feed_action(&event.event) {
                    FeedAction::Refetch => {
                        let records = self.fetch_partition(collection, partition).await?;
                        if !sink.snapshot(records) {
                            return Ok(());
                        }
                    }
                    FeedAction::Ignore => {}
                    FeedAction::Fail(reason) => return Err(unavailable(reason)),
                }
            }
        }

        Err(unavailable("feed closed by the server"))
    }
}

/// Turn a query response (`null` or `{id: fields}`) into records.
fn parse_snapshot(value: Value) -> Vec<StoredRecord> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(id, value)| match value {
                Value::Object(fields) => Some(StoredRecord {
                    id: RecordId::new(id),
                    fields,
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl RemoteStore for FirebaseStore {
    async fn put(&self, collection: &Collection, record: NewRecord) -> ShiftboardResult<RecordId> {
        let mut body = record.fields;
        body.insert(
            collection.partition_field.to_string(),
            Value::String(record.partition.to_string()),
        );
        body.insert(
            CREATED_AT_FIELD.to_string(),
            json!({ ".sv": "timestamp" }),
        );

        let url = self.collection_url(collection)?;
        let response = self.call(self.client.post(url).json(&body)).await?;

        response
            .get("name")
            .and_then(Value::as_str)
            .map(RecordId::from)
            .ok_or_else(|| unavailable(format!("unexpected push response: {response}")))
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &RecordId,
        patch: Fields,
    ) -> ShiftboardResult<()> {
        let url = self.record_url(collection, id)?;
        let current = self.call(self.client.get(url.clone())).await?;
        ensure_exists(&current, id)?;

        let body = update_body(collection, patch);
        self.call(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &RecordId) -> ShiftboardResult<()> {
        let url = self.record_url(collection, id)?;
        self.call(self.client.delete(url)).await?;
        Ok(())
    }

    async fn clear_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
    ) -> ShiftboardResult<()> {
        let body: Fields = self
            .fetch_partition(collection, partition)
            .await?
            .into_iter()
            .map(|r| (r.id.to_string(), Value::Null))
            .collect();
        self.patch_collection(collection, body).await
    }

    async fn replace_partition(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        records: Vec<StoredRecord>,
    ) -> ShiftboardResult<()> {
        for record in &records {
            check_key("record id", record.id.as_str())?;
        }
        let mut body: Fields = self
            .fetch_partition(collection, partition)
            .await?
            .into_iter()
            .map(|r| (r.id.to_string(), Value::Null))
            .collect();
        for record in records {
            let mut fields = record.fields;
            fields.insert(
                collection.partition_field.to_string(),
                Value::String(partition.to_string()),
            );
            body.insert(record.id.to_string(), Value::Object(fields));
        }
        self.patch_collection(collection, body).await
    }

    fn subscribe(
        &self,
        collection: &Collection,
        partition: &PartitionKey,
        sink: SnapshotSink,
    ) -> Subscription {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            sink.unavailable("no async runtime to drive the live feed");
            return Subscription::inert();
        };

        tracing::debug!(collection = %collection.name, %partition, "opening live feed");
        let task = runtime.spawn(self.clone().watch(
            collection.clone(),
            partition.clone(),
            sink,
        ));
        Subscription::new(move || task.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> Collection {
        Collection {
            name: "calendar_posts".to_string(),
            partition_field: "ym",
        }
    }

    #[test]
    fn partition_url_filters_on_partition_field() {
        let store = FirebaseStore::new("https://example-rtdb.firebaseio.com", None).unwrap();
        let url = store
            .partition_url(&collection(), &PartitionKey::from_stored("2025-12"))
            .unwrap();

        assert_eq!(url.path(), "/calendar_posts.json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("orderBy".to_string(), "\"ym\"".to_string()),
                ("equalTo".to_string(), "\"2025-12\"".to_string()),
            ]
        );
    }

    #[test]
    fn auth_token_is_appended_to_every_url() {
        let store =
            FirebaseStore::new("https://example-rtdb.firebaseio.com/base", Some("s3cret".into()))
                .unwrap();
        let url = store
            .record_url(&collection(), &RecordId::from("-Nabc"))
            .unwrap();

        assert_eq!(url.path(), "/base/calendar_posts/-Nabc.json");
        assert_eq!(url.query(), Some("auth=s3cret"));
    }

    #[test]
    fn record_urls_stay_inside_their_collection() {
        let store = FirebaseStore::new("https://example-rtdb.firebaseio.com", None).unwrap();
        let pins = Collection {
            name: "map_pins".to_string(),
            partition_field: "map",
        };

        let url = store.record_url(&pins, &RecordId::from("local_3f2a")).unwrap();
        assert_eq!(url.path(), "/map_pins/local_3f2a.json");

        for id in ["", "../", "../calendar_posts", "a/b", ".", "-N.x", "$x", "a#b", "[0]", "a\nb"] {
            assert!(
                matches!(
                    store.record_url(&pins, &RecordId::from(id)),
                    Err(ShiftboardError::InvalidInput(_))
                ),
                "id {id:?} should be rejected"
            );
        }

        let escaping = Collection {
            name: "../secrets".to_string(),
            partition_field: "map",
        };
        assert!(store.collection_url(&escaping).is_err());
    }

    #[tokio::test]
    async fn writes_with_unsafe_ids_never_leave_the_client() {
        // Nothing listens on this port; a request that got sent would surface
        // as StoreUnavailable rather than InvalidInput.
        let store = FirebaseStore::new("http://127.0.0.1:9", None).unwrap();
        let pins = Collection {
            name: "map_pins".to_string(),
            partition_field: "map",
        };

        assert!(matches!(
            store.delete(&pins, &RecordId::from("../")).await,
            Err(ShiftboardError::InvalidInput(_))
        ));
        assert!(matches!(
            store.update(&pins, &RecordId::from("../"), Fields::new()).await,
            Err(ShiftboardError::InvalidInput(_))
        ));
        let records = vec![StoredRecord {
            id: RecordId::from("../calendar_posts"),
            fields: Fields::new(),
        }];
        assert!(matches!(
            store
                .replace_partition(&pins, &PartitionKey::from_stored("alpha:dust"), records)
                .await,
            Err(ShiftboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn feed_events_map_to_actions() {
        assert_eq!(feed_action("put"), FeedAction::Refetch);
        assert_eq!(feed_action("patch"), FeedAction::Refetch);
        assert_eq!(feed_action("keep-alive"), FeedAction::Ignore);
        assert_eq!(feed_action("something-new"), FeedAction::Ignore);
        assert!(matches!(feed_action("cancel"), FeedAction::Fail(_)));
        assert!(matches!(feed_action("auth_revoked"), FeedAction::Fail(_)));
    }

    #[test]
    fn feed_stream_events_drive_actions() {
        let mut parser = SseParser::new();
        let events = parser.feed(
            b"event: keep-alive\ndata: null\n\n\
              event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n\
              event: auth_revoked\ndata: credential is no longer valid\n\n",
        );
        let actions: Vec<FeedAction> = events.iter().map(|e| feed_action(&e.event)).collect();
        assert_eq!(
            actions,
            vec![
                FeedAction::Ignore,
                FeedAction::Refetch,
                FeedAction::Fail("auth token revoked"),
            ]
        );
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let id = RecordId::from("-Ngone");
        assert!(matches!(
            ensure_exists(&Value::Null, &id),
            Err(ShiftboardError::NotFound(missing)) if missing == "-Ngone"
        ));
        assert!(ensure_exists(&json!({ "x": 0.5 }), &id).is_ok());
    }

    #[test]
    fn update_body_keeps_partition_and_creation_time() {
        let patch = json!({ "x": 0.2, "y": 0.8, "map": "bravo:dust", "createdAt": 1 });
        let Value::Object(patch) = patch else {
            unreachable!()
        };
        let pins = Collection {
            name: "map_pins".to_string(),
            partition_field: "map",
        };

        let body = update_body(&pins, patch);
        assert_eq!(Value::Object(body), json!({ "x": 0.2, "y": 0.8 }));
    }

    #[test]
    fn rejects_unparseable_database_url() {
        assert!(matches!(
            FirebaseStore::new("not a url", None),
            Err(ShiftboardError::Config(_))
        ));
    }

    #[test]
    fn snapshot_parsing_skips_non_objects() {
        let records = parse_snapshot(json!({
            "-Na": { "ym": "2025-12", "day": 3 },
            "-Nb": 17,
        }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "-Na");

        assert!(parse_snapshot(Value::Null).is_empty());
    }
}
