use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::customer::{CustomerId, CustomerRecord};
use crate::errors::OracleError;
use crate::ports::PersistenceOracle;

pub const DEFAULT_CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadConsistency {
    Strong,
    Eventual { timeout: Duration, interval: Duration },
}

impl Default for ReadConsistency {
    fn default() -> Self {
        Self::Eventual { timeout: DEFAULT_CONVERGENCE_TIMEOUT, interval: DEFAULT_POLL_INTERVAL }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Convergence<T> {
    Converged(T),
    TimedOut { last: T, attempts: u32, waited: Duration },
}

impl<T> Convergence<T> {
    pub fn observation(&self) -> &T {
        match self {
            Self::Converged(observation) => observation,
            Self::TimedOut { last, .. } => last,
        }
    }

    pub fn into_observation(self) -> T {
        match self {
            Self::Converged(observation) => observation,
            Self::TimedOut { last, .. } => last,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged(_))
    }
}

/// Re-reads the oracle until an observation satisfies the caller's
/// predicate or the consistency window closes.
pub struct ConvergingReader<O: ?Sized> {
    oracle: Arc<O>,
    consistency: ReadConsistency,
}

impl<O: ?Sized> Clone for ConvergingReader<O> {
    fn clone(&self) -> Self {
        Self { oracle: Arc::clone(&self.oracle), consistency: self.consistency }
    }
}

impl<O> ConvergingReader<O>
where
    O: PersistenceOracle + ?Sized,
{
    pub fn new(oracle: Arc<O>, consistency: ReadConsistency) -> Self {
        Self { oracle, consistency }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn is_eventual(&self) -> bool {
        matches!(self.consistency, ReadConsistency::Eventual { .. })
    }

    pub async fn by_id<P>(
        &self,
        id: CustomerId,
        settled: P,
    ) -> Result<Convergence<Option<CustomerRecord>>, OracleError>
    where
        P: Fn(&Option<CustomerRecord>) -> bool,
    {
        let oracle: &O = &self.oracle;
        self.poll(move || oracle.find_by_id(id), settled).await
    }

    pub async fn by_email<P>(
        &self,
        email: &str,
        settled: P,
    ) -> Result<Convergence<Option<CustomerRecord>>, OracleError>
    where
        P: Fn(&Option<CustomerRecord>) -> bool,
    {
        let oracle: &O = &self.oracle;
        self.poll(move || oracle.find_by_email(email), settled).await
    }

    async fn poll<T, R, Fut, P>(&self, read: R, settled: P) -> Result<Convergence<T>, OracleError>
    where
        R: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, OracleError>>,
        P: Fn(&T) -> bool,
    {
        let (timeout, interval) = match self.consistency {
            ReadConsistency::Strong => {
                let observation = read().await?;
                if settled(&observation) {
                    return Ok(Convergence::Converged(observation));
                }
                return Ok(Convergence::TimedOut {
                    last: observation,
                    attempts: 1,
                    waited: Duration::ZERO,
                });
            }
            ReadConsistency::Eventual { timeout, interval } => (timeout, interval),
        };

        let started = Instant::now();
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let observation = read().await?;
            if settled(&observation) {
                return Ok(Convergence::Converged(observation));
            }

            let waited = started.elapsed();
            if waited >= timeout {
                debug!(
                    event_name = "oracle.convergence.timed_out",
                    attempts,
                    waited_ms = waited.as_millis() as u64,
                    "oracle state did not converge"
                );
                return Ok(Convergence::TimedOut { last: observation, attempts, waited });
            }

            tokio::time::sleep(interval.min(timeout - waited)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::domain::customer::{CustomerDraft, CustomerId};
    use crate::fakes::InMemoryCustomerStore;
    use crate::oracle::{Convergence, ConvergingReader, ReadConsistency};

    fn eventual(timeout_ms: u64) -> ReadConsistency {
        ReadConsistency::Eventual {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn strong_read_reports_single_attempt() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let reader = ConvergingReader::new(store, ReadConsistency::Strong);

        let result = reader.by_id(CustomerId(1), |found| found.is_some()).await.expect("read");

        assert!(matches!(result, Convergence::TimedOut { attempts: 1, .. }));
        assert_eq!(result.observation(), &None);
    }

    #[tokio::test]
    async fn eventual_read_waits_for_lagging_visibility() {
        let store = Arc::new(InMemoryCustomerStore::with_visibility_lag(Duration::from_millis(40)));
        let record = store
            .insert(&CustomerDraft::new("Alice", "Stockholm", "alice@test.com", true))
            .await
            .expect("insert");
        let reader = ConvergingReader::new(Arc::clone(&store), eventual(1_000));

        let result = reader.by_id(record.id, |found| found.is_some()).await.expect("read");

        assert!(result.converged());
        assert_eq!(result.into_observation(), Some(record));
    }

    #[tokio::test]
    async fn eventual_read_gives_up_at_the_ceiling() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let reader = ConvergingReader::new(store, eventual(50));

        let result =
            reader.by_email("nobody@test.com", |found| found.is_some()).await.expect("read");

        match result {
            Convergence::TimedOut { last, attempts, waited } => {
                assert_eq!(last, None);
                assert!(attempts > 1);
                assert!(waited >= Duration::from_millis(50));
            }
            Convergence::Converged(_) => panic!("empty store cannot converge"),
        }
    }
}
