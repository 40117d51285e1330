use std::future::{Future, ready};
use std::pin::pin;

use futures::{StreamExt, stream};

/// what a single server attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome<T> {
    Success(T),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome<T> {
    Success(T),
    Exhausted,
}

/// Runs `attempt` over the candidates one at a time, in order, and stops at the first success.
///
/// Attempts are never started concurrently, the next candidate is only touched once the
/// previous one came back with `Skip`.
pub async fn first_success<I, T, F, Fut, R>(candidates: I, attempt: F) -> ChainOutcome<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = CandidateOutcome<R>>,
{
    let successes = stream::iter(candidates)
        .then(attempt)
        .filter_map(|outcome| {
            ready(match outcome {
                CandidateOutcome::Success(value) => Some(value),
                CandidateOutcome::Skip => None,
            })
        });

    match pin!(successes).next().await {
        Some(value) => ChainOutcome::Success(value),
        None => ChainOutcome::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn stops_at_first_success() {
        let attempts = AtomicUsize::new(0);

        let outcome = first_success([1, 2, 3, 4], |n| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n % 2 == 0 {
                    CandidateOutcome::Success(n)
                } else {
                    CandidateOutcome::Skip
                }
            }
        })
        .await;

        assert_eq!(outcome, ChainOutcome::Success(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted() {
        let outcome: ChainOutcome<u8> =
            first_success(Vec::<u8>::new(), |_| async { CandidateOutcome::Skip }).await;
        assert_eq!(outcome, ChainOutcome::Exhausted);
    }
}
