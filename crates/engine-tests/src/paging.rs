#[cfg(test)]
mod tests {
    use crate::utils::{
        JOB_ID, PROJECT, as_dyn, ints, job, reference, results_page, results_path, script_pages,
        scripted,
    };
    use client::{Client, ClientConfig, PagerLimits, QueryRequest};
    use engine_core::{
        ClientError, fetch_query_results,
        insert::InsertOptions,
    };
    use futures::TryStreamExt;
    use model::{
        core::identifiers::TableReference,
        pagination::{options::QueryResultsOptions, page::CachedPage},
        records::row::Row,
    };
    use serde_json::json;
    use tracing_test::traced_test;
    use transport::Method;

    fn options() -> QueryResultsOptions {
        QueryResultsOptions::for_job(reference())
    }

    // Scenario: 7 rows split into pages of 3, paged manually by feeding each
    // `next_query` back in.
    // Expected Outcome: All 7 rows exactly once, in order, ending with no continuation.
    #[traced_test]
    #[tokio::test]
    async fn tc01() {
        let transport = scripted();
        script_pages(&transport, 7, 3);

        let mut rows: Vec<Row> = Vec::new();
        let mut next = Some(options().with_max_results(3));
        let mut fetches = 0;
        while let Some(query) = next {
            let page = fetch_query_results(transport.as_ref(), &query, None).await.unwrap();
            rows.extend(page.rows);
            next = page.next_query;
            fetches += 1;
        }

        assert_eq!(ints(&rows), (0..7).collect::<Vec<i64>>());
        assert_eq!(fetches, 3);

        let tokens: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| r.query_value("pageToken").map(str::to_string))
            .collect();
        assert_eq!(
            tokens,
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
        assert!(transport.requests().iter().all(|r| r.query_value("maxResults") == Some("3")));
    }

    // Scenario: `timeoutMs = 1000` against a response `{jobComplete: false}`.
    // Expected Outcome:
    // - A timeout error whose message contains "1000ms".
    // - `next_query` is still populated and the raw response is preserved.
    #[traced_test]
    #[tokio::test]
    async fn tc02() {
        let transport = scripted();
        transport.push(
            Method::Get,
            results_path(JOB_ID),
            json!({
                "kind": "bigquery#getQueryResultsResponse",
                "jobReference": {"projectId": PROJECT, "jobId": JOB_ID},
                "jobComplete": false,
                "pageToken": "ignored"
            }),
        );

        let query = options().with_timeout_ms(1000);
        let err = fetch_query_results(transport.as_ref(), &query, None)
            .await
            .unwrap_err();

        assert!(matches!(err.error, ClientError::Timeout { timeout_ms: 1000 }));
        assert!(err.to_string().contains("1000ms"));
        assert_eq!(err.next_query, Some(query));
        let response = err.response.expect("raw response");
        assert_eq!(response.job_complete, Some(false));
        assert_eq!(response.kind.as_deref(), Some("bigquery#getQueryResultsResponse"));
        assert_eq!(
            transport.requests()[0].query_value("timeoutMs"),
            Some("1000")
        );
    }

    // Scenario: A cached first page is handed to the first fetch only.
    // Expected Outcome: The first fetch makes no request; the second one does.
    #[tokio::test]
    async fn tc03() {
        let transport = scripted();
        transport.push(Method::Get, results_path(JOB_ID), results_page(1..3, 3, None));

        let first_page: model::pagination::page::QueryResultsResponse =
            serde_json::from_value(results_page(0..1, 3, Some("page-1"))).unwrap();
        let mut cached = Some(CachedPage {
            rows: Vec::new(),
            response: first_page,
        });

        let job = job(&transport);
        let page = job.get_query_results(options(), cached.take()).await.unwrap();
        assert_eq!(transport.call_count(), 0);
        let next = page.next_query.expect("continuation from cached token");
        assert_eq!(next.page_token.as_deref(), Some("page-1"));

        let page = job.get_query_results(next, cached.take()).await.unwrap();
        assert_eq!(transport.call_count(), 1);
        assert_eq!(ints(&page.rows), vec![1, 2]);
        assert!(page.next_query.is_none());
    }

    // Scenario: The prior options carry a start index and the response carries a token.
    // Expected Outcome: The continuation keeps the token and drops the start index.
    #[tokio::test]
    async fn tc04() {
        let transport = scripted();
        transport.push(Method::Get, results_path(JOB_ID), results_page(10..12, 20, Some("tok")));

        let query = options().with_start_index(10).with_max_results(2);
        let page = fetch_query_results(transport.as_ref(), &query, None).await.unwrap();
        let next = page.next_query.unwrap();

        assert_eq!(transport.requests()[0].query_value("startIndex"), Some("10"));
        assert_eq!(next.page_token.as_deref(), Some("tok"));
        assert_eq!(next.start_index, None);
        assert_eq!(next.max_results, Some(2));
    }

    // Scenario: A query answered inline with its first page, followed by two more pages.
    // Expected Outcome: `query_all` returns every row and fetches only the later pages.
    #[traced_test]
    #[tokio::test]
    async fn tc05() {
        let transport = scripted();
        transport.push(
            Method::Post,
            format!("projects/{PROJECT}/queries"),
            json!({
                "kind": "bigquery#queryResponse",
                "jobReference": {"projectId": PROJECT, "jobId": JOB_ID, "location": "EU"},
                "jobComplete": true,
                "schema": {"fields": [{"name": "n", "type": "INTEGER"}]},
                "rows": [{"f": [{"v": "0"}]}, {"f": [{"v": "1"}]}],
                "pageToken": "page-1",
                "totalRows": "5"
            }),
        );
        transport
            .push(Method::Get, results_path(JOB_ID), results_page(2..4, 5, Some("page-2")))
            .push(Method::Get, results_path(JOB_ID), results_page(4..5, 5, None));

        let client = Client::new(ClientConfig::new(PROJECT), as_dyn(&transport));
        let rows = client
            .query_all(QueryRequest::new("SELECT n FROM t").with_max_results(2), PagerLimits::unlimited())
            .await
            .unwrap();

        assert_eq!(ints(&rows), vec![0, 1, 2, 3, 4]);
        assert_eq!(transport.calls_to(Method::Get, &results_path(JOB_ID)), 2);

        let get = &transport.requests()[1];
        assert_eq!(get.query_value("pageToken"), Some("page-1"));
        assert_eq!(get.query_value("location"), Some("EU"));
    }

    // Scenario: The job is still running on the first results fetch and no timeout is set.
    // Expected Outcome: The same query is repeated until the rows arrive.
    #[tokio::test]
    async fn tc06() {
        let transport = scripted();
        transport
            .push(Method::Get, results_path(JOB_ID), json!({"jobComplete": false}))
            .push(Method::Get, results_path(JOB_ID), json!({"jobComplete": false}))
            .push(Method::Get, results_path(JOB_ID), results_page(0..2, 2, None));

        let client = Client::new(ClientConfig::new(PROJECT), as_dyn(&transport));
        let rows: Vec<Row> = client
            .pager(options().with_start_index(0), PagerLimits::unlimited())
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ints(&rows), vec![0, 1]);
        assert!(
            transport
                .requests()
                .iter()
                .all(|r| r.query_value("startIndex") == Some("0") && r.query_value("pageToken").is_none())
        );
    }

    // Scenario: Auto-pagination with a cap on API calls.
    // Expected Outcome: Paging stops at the cap even though more pages exist.
    #[tokio::test]
    async fn tc07() {
        let transport = scripted();
        script_pages(&transport, 10, 2);

        let client = Client::new(ClientConfig::new(PROJECT), as_dyn(&transport));
        let mut pager = client.pager(options(), PagerLimits::unlimited().with_max_api_calls(2));
        let rows = pager.all().await.unwrap();

        assert_eq!(ints(&rows), vec![0, 1, 2, 3]);
        assert_eq!(pager.api_calls(), 2);
        assert!(pager.next_query().is_some());
    }

    // Scenario: A streaming insert where rows 1 and 3 are rejected.
    // Expected Outcome: A partial failure listing exactly those rows, in input order.
    #[traced_test]
    #[tokio::test]
    async fn tc08() {
        let transport = scripted();
        transport.push(
            Method::Post,
            format!("projects/{PROJECT}/datasets/sales/tables/orders/insertAll"),
            json!({"insertErrors": [
                {"index": 3, "errors": [{"reason": "invalid", "message": "no such field: qty"}]},
                {"index": 1, "errors": [{"reason": "invalid", "message": "bad value"},
                                        {"reason": "stopped", "message": ""}]}
            ]}),
        );
        let client = Client::new(ClientConfig::new(PROJECT), as_dyn(&transport));
        let table = TableReference::new(PROJECT, "sales", "orders");

        let rows = (0..4).map(|id| json!({"id": id})).collect();
        let err = client
            .insert_rows(&table, rows, &InsertOptions::default())
            .await
            .unwrap_err();

        let failures = match err {
            ClientError::PartialFailure { failures } => failures,
            other => panic!("expected partial failure, got {other:?}"),
        };
        assert_eq!(failures.iter().map(|f| f.index).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(failures[0].row, json!({"id": 1}));
        assert_eq!(failures[0].errors.len(), 2);
        assert_eq!(failures[1].row, json!({"id": 3}));
    }
}
