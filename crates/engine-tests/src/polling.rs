#[cfg(test)]
mod tests {
    use crate::utils::{
        FAST_POLL, JOB_ID, failed_status, job, job_path, job_status, reference, scripted,
        as_dyn,
    };
    use engine_core::{ClientError, Job, JobEvent, PollOutcome};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;
    use transport::{Method, TransportError};

    // Scenario: The job is polled three times: RUNNING, RUNNING, DONE.
    // Expected Outcome:
    // - Exactly one `complete` event, carrying the third response's metadata.
    // - No polling after the terminal event.
    #[traced_test]
    #[tokio::test]
    async fn tc01() {
        let transport = scripted();
        transport
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 1))
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 2))
            .push(Method::Get, job_path(JOB_ID), job_status("DONE", 3));
        let job = job(&transport);

        let mut listener = job.on_complete();
        let event = listener.recv().await.expect("terminal event");

        match event {
            JobEvent::Complete(metadata) => {
                assert!(metadata.is_done());
                assert_eq!(metadata.statistics.unwrap()["poll"], 3);
            }
            JobEvent::Error(err) => panic!("unexpected error event: {err}"),
        }
        assert!(listener.recv().await.is_none());

        tokio::time::sleep(FAST_POLL * 10).await;
        assert_eq!(transport.calls_to(Method::Get, &job_path(JOB_ID)), 3);
        assert!(logs_contain("Job completed"));
    }

    // Scenario: The status fetch succeeds, but the job finished with an error result.
    // Expected Outcome: One `error` event holding the structured failure.
    #[traced_test]
    #[tokio::test]
    async fn tc02() {
        let transport = scripted();
        transport
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 1))
            .push(
                Method::Get,
                job_path(JOB_ID),
                failed_status("invalidQuery", "Unrecognized name: nme"),
            );
        let job = job(&transport);

        let event = job.on_complete().recv().await.expect("terminal event");

        let err = event.into_result().unwrap_err();
        match err.as_ref() {
            ClientError::OperationFailed { job_id, error, .. } => {
                assert_eq!(job_id, JOB_ID);
                assert_eq!(error.reason.as_deref(), Some("invalidQuery"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // Scenario: A status fetch fails with a server error while the job is running.
    // Expected Outcome:
    // - The failure ends polling with one `error` event.
    // - The job engine does not retry the request itself.
    #[traced_test]
    #[tokio::test]
    async fn tc03() {
        let transport = scripted();
        transport
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 1))
            .push_error(
                Method::Get,
                job_path(JOB_ID),
                TransportError::http(503, "backend unavailable"),
            )
            .push(Method::Get, job_path(JOB_ID), job_status("DONE", 3));
        let mut job = job(&transport);

        let err = job
            .wait_for_completion(CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Transport(ref e) if e.status() == Some(503)));
        assert_eq!(transport.calls_to(Method::Get, &job_path(JOB_ID)), 2);
        assert_eq!(transport.remaining(Method::Get, &job_path(JOB_ID)), 1);
    }

    // Scenario: The only completion listener is dropped while the job is still running.
    // Expected Outcome: Polling stops immediately and no further requests are made.
    #[traced_test]
    #[tokio::test]
    async fn tc04() {
        let transport = scripted();
        for poll in 0..50 {
            transport.push(Method::Get, job_path(JOB_ID), job_status("RUNNING", poll));
        }
        let job = job(&transport).with_poll_interval(Duration::from_millis(5));

        let listener = job.on_complete();
        while transport.call_count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(job.is_polling());

        drop(listener);
        assert!(!job.is_polling());
        let calls = transport.call_count();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.call_count(), calls);
        assert_eq!(job.listener_count(), 0);
    }

    // Scenario: No completion listener is ever registered.
    // Expected Outcome: The handle makes no requests on its own.
    #[tokio::test]
    async fn tc05() {
        let transport = scripted();
        transport.push(Method::Get, job_path(JOB_ID), job_status("DONE", 1));
        let job = job(&transport);

        tokio::time::sleep(FAST_POLL * 10).await;

        assert_eq!(transport.call_count(), 0);
        assert!(!job.is_polling());
        assert!(job.metadata().is_none());
    }

    // Scenario: Two handles for the same job each wait for completion.
    // Expected Outcome: Each handle polls on its own; both see DONE.
    #[tokio::test]
    async fn tc06() {
        let transport = scripted();
        for poll in 1..=4 {
            let state = if poll % 2 == 0 { "DONE" } else { "RUNNING" };
            transport.push(Method::Get, job_path(JOB_ID), job_status(state, poll));
        }
        let mut first = job(&transport);
        let mut second = Job::new(as_dyn(&transport), reference()).with_poll_interval(FAST_POLL);

        let a = first.wait_for_completion(CancellationToken::new()).await.unwrap();
        let b = second.wait_for_completion(CancellationToken::new()).await.unwrap();

        assert!(a.is_done() && b.is_done());
        assert_eq!(transport.call_count(), 4);
        assert!(first.is_done() && second.is_done());
    }

    // Scenario: A running job is cancelled, then observed until it stops.
    // Expected Outcome:
    // - The cancel request returns before the job is done.
    // - Polling afterwards reports the job's final state.
    #[traced_test]
    #[tokio::test]
    async fn tc07() {
        let transport = scripted();
        transport
            .push(
                Method::Post,
                format!("{}/cancel", job_path(JOB_ID)),
                serde_json::json!({"kind": "bigquery#jobCancelResponse", "job": job_status("RUNNING", 1)}),
            )
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 2))
            .push(
                Method::Get,
                job_path(JOB_ID),
                failed_status("stopped", "Job execution was cancelled: User requested cancellation"),
            );
        let mut job = job(&transport);

        job.cancel().await.unwrap();
        assert!(!job.is_done());
        assert_eq!(transport.requests()[0].query_value("location"), Some("EU"));

        assert!(matches!(job.poll().await, PollOutcome::Incomplete));
        match job.poll().await {
            PollOutcome::Failed(ClientError::OperationFailed { error, .. }) => {
                assert_eq!(error.reason.as_deref(), Some("stopped"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    // Scenario: A listener registers after the terminal event was published.
    // Expected Outcome: It receives the same event without new requests.
    #[tokio::test]
    async fn tc08() {
        let transport = scripted();
        transport.push(Method::Get, job_path(JOB_ID), job_status("DONE", 1));
        let job = job(&transport);

        let mut early = job.on_complete();
        assert!(early.recv().await.unwrap().is_complete());

        let mut late = job.on_complete();
        assert!(late.recv().await.unwrap().is_complete());
        assert_eq!(transport.call_count(), 1);
    }

    // Scenario: Polling a job that is already DONE, repeatedly.
    // Expected Outcome: The result stays `Complete` and only the first poll hits the service.
    #[tokio::test]
    async fn tc09() {
        let transport = scripted();
        transport.push(Method::Get, job_path(JOB_ID), job_status("DONE", 1));
        let mut job = job(&transport);

        for _ in 0..3 {
            assert!(matches!(job.poll().await, PollOutcome::Complete(_)));
            assert!(job.is_done());
        }
        assert_eq!(transport.call_count(), 1);
    }

    // Scenario: The job ID does not resolve.
    // Expected Outcome: `exists` is false and `get_metadata` reports `NotFound` with the location.
    #[tokio::test]
    async fn tc10() {
        let transport = scripted();
        transport
            .push_error(Method::Get, job_path(JOB_ID), TransportError::http(404, "Not found: Job"))
            .push_error(Method::Get, job_path(JOB_ID), TransportError::http(404, "Not found: Job"));
        let mut job = job(&transport);

        assert!(!job.exists().await.unwrap());
        let err = job.get_metadata().await.unwrap_err();
        assert!(
            matches!(err, ClientError::NotFound { ref location, .. } if location.as_deref() == Some("EU"))
        );
    }

    // Scenario: A listener receives `complete`, then the caller reads and polls its own handle.
    // Expected Outcome:
    // - The handle reports DONE with the metadata the poller fetched.
    // - Polling the handle again makes no request.
    #[traced_test]
    #[tokio::test]
    async fn tc11() {
        let transport = scripted();
        transport
            .push(Method::Get, job_path(JOB_ID), job_status("RUNNING", 1))
            .push(Method::Get, job_path(JOB_ID), job_status("DONE", 2));
        let mut job = job(&transport);

        let event = job.on_complete().recv().await.expect("terminal event");
        assert!(event.is_complete());

        assert!(job.is_done());
        let metadata = job.metadata().expect("cached metadata");
        assert_eq!(metadata.statistics.unwrap()["poll"], 2);

        match job.poll().await {
            PollOutcome::Complete(metadata) => assert!(metadata.is_done()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(transport.call_count(), 2);
    }
}
