use crate::error::{ClientError, RowFailure};
use model::{
    core::identifiers::TableReference,
    insert::{InsertAllRequest, InsertAllResponse, InsertRow},
};
use serde_json::Value as Json;
use tracing::{info, warn};
use transport::{ApiRequest, Transport, TransportError};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InsertOptions {
    /// Rows are already `{insertId, json}` objects and are sent untouched.
    pub raw: bool,
    /// Give every row a random `insertId` for best-effort deduplication.
    pub create_insert_id: bool,
    pub skip_invalid_rows: Option<bool>,
    pub ignore_unknown_values: Option<bool>,
    pub template_suffix: Option<String>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        InsertOptions {
            raw: false,
            create_insert_id: true,
            skip_invalid_rows: None,
            ignore_unknown_values: None,
            template_suffix: None,
        }
    }
}

/// Streams rows into a table. Rows the service rejects come back as
/// `PartialFailure`, ordered by their position in `rows`.
pub async fn insert_rows(
    transport: &dyn Transport,
    table: &TableReference,
    rows: Vec<Json>,
    options: &InsertOptions,
) -> Result<InsertAllResponse, ClientError> {
    if rows.is_empty() {
        return Err(TransportError::InvalidRequest(
            "You must provide at least 1 row to be inserted.".into(),
        )
        .into());
    }

    let rows = rows
        .into_iter()
        .map(|row| to_insert_row(row, options))
        .collect::<Result<Vec<_>, _>>()?;

    let body = InsertAllRequest {
        rows,
        skip_invalid_rows: options.skip_invalid_rows,
        ignore_unknown_values: options.ignore_unknown_values,
        template_suffix: options.template_suffix.clone(),
    };

    let request = ApiRequest::post(format!("{}/insertAll", table.path()))
        .with_body(serde_json::to_value(&body).map_err(TransportError::from)?);
    let raw = transport.request(request).await?;
    let response: InsertAllResponse = serde_json::from_value(raw).map_err(TransportError::from)?;

    if response.insert_errors.is_empty() {
        info!(table = %table, rows = body.rows.len(), "Inserted rows");
        return Ok(response);
    }

    let mut failures: Vec<RowFailure> = response
        .insert_errors
        .into_iter()
        .map(|entry| RowFailure {
            row: body
                .rows
                .get(entry.index)
                .map(|r| r.json.clone())
                .unwrap_or(Json::Null),
            index: entry.index,
            errors: entry.errors,
        })
        .collect();
    failures.sort_by_key(|failure| failure.index);

    warn!(
        table = %table,
        rows = body.rows.len(),
        failed = failures.len(),
        "Insert partially failed"
    );
    Err(ClientError::PartialFailure { failures })
}

fn to_insert_row(row: Json, options: &InsertOptions) -> Result<InsertRow, ClientError> {
    if options.raw {
        return Ok(serde_json::from_value(row).map_err(TransportError::from)?);
    }

    Ok(InsertRow {
        insert_id: options
            .create_insert_id
            .then(|| Uuid::new_v4().to_string()),
        json: row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use transport::{Method, testing::ScriptedTransport};

    const PATH: &str = "projects/p/datasets/d/tables/t/insertAll";

    fn table() -> TableReference {
        TableReference::new("p", "d", "t")
    }

    #[tokio::test]
    async fn wraps_rows_with_insert_ids() {
        let transport = ScriptedTransport::new();
        transport.push(Method::Post, PATH, json!({"kind": "bigquery#tableDataInsertAllResponse"}));

        insert_rows(
            &transport,
            &table(),
            vec![json!({"name": "a"}), json!({"name": "b"})],
            &InsertOptions::default(),
        )
        .await
        .unwrap();

        let body = transport.requests()[0].body.clone().unwrap();
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["json"]["name"], "b");
        assert!(rows[0]["insertId"].is_string());
        assert_ne!(rows[0]["insertId"], rows[1]["insertId"]);
    }

    #[tokio::test]
    async fn partial_failure_keeps_row_correspondence() {
        let transport = ScriptedTransport::new();
        transport.push(
            Method::Post,
            PATH,
            json!({"insertErrors": [
                {"index": 2, "errors": [{"reason": "invalid", "message": "bad c"}]},
                {"index": 0, "errors": [{"reason": "invalid", "message": "bad a"}]}
            ]}),
        );

        let err = insert_rows(
            &transport,
            &table(),
            vec![json!({"v": "a"}), json!({"v": "b"}), json!({"v": "c"})],
            &InsertOptions::default(),
        )
        .await
        .unwrap_err();

        match err {
            ClientError::PartialFailure { failures } => {
                let indexes: Vec<_> = failures.iter().map(|f| f.index).collect();
                assert_eq!(indexes, vec![0, 2]);
                assert_eq!(failures[0].row, json!({"v": "a"}));
                assert_eq!(failures[1].errors[0].message.as_deref(), Some("bad c"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn raw_rows_are_sent_as_given() {
        let transport = ScriptedTransport::new();
        transport.push(Method::Post, PATH, json!({}));

        let options = InsertOptions {
            raw: true,
            skip_invalid_rows: Some(true),
            ..Default::default()
        };
        insert_rows(
            &transport,
            &table(),
            vec![json!({"insertId": "row-1", "json": {"v": 1}})],
            &options,
        )
        .await
        .unwrap();

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["rows"][0]["insertId"], "row-1");
        assert_eq!(body["skipInvalidRows"], true);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_locally() {
        let transport = ScriptedTransport::new();
        let err = insert_rows(&transport, &table(), Vec::new(), &InsertOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Transport(TransportError::InvalidRequest(_))
        ));
        assert_eq!(transport.call_count(), 0);
    }
}
