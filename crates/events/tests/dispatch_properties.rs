//! Property-based tests for dispatch over the durable store.
//!
//! Properties verified:
//! - A chain of guarded reactions runs in order up to the first failure
//! - No reaction runs twice in one dispatch
//! - Flags of a failed reaction never reach the store, its facts do

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::sync::Arc;

use async_trait::async_trait;
use drydock_events::{
    Error, EventBusBuilder, FactStore, Guard, Reaction, ReactionContext, Result,
    SurrealFactStore, Trigger,
};
use proptest::prelude::*;

/// Link `index` of a chain: runs once the previous link's flag is set.
struct Link {
    id: String,
    index: usize,
    fail: bool,
}

fn step(index: usize) -> String {
    format!("step.{index}")
}

#[async_trait]
impl Reaction for Link {
    fn id(&self) -> &str {
        &self.id
    }

    fn guard(&self) -> Guard {
        match self.index {
            0 => Guard::new().on("update"),
            n => Guard::new().when(step(n - 1)),
        }
    }

    async fn run(&self, ctx: &mut ReactionContext<'_>) -> Result<()> {
        ctx.facts().set(&format!("visited.{}", self.index), "yes".to_string()).await?;
        ctx.set_flag(step(self.index));
        if self.fail {
            return Err(Error::reaction_failed(&self.id, "injected"));
        }
        Ok(())
    }
}

fn chain(failures: &[bool]) -> Vec<Arc<dyn Reaction>> {
    failures
        .iter()
        .enumerate()
        .map(|(index, fail)| {
            Arc::new(Link {
                id: format!("link-{index}"),
                index,
                fail: *fail,
            }) as Arc<dyn Reaction>
        })
        .collect()
}

fn fail_case(err: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(err.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: the chain advances one link per pass and stops at the first
    /// failing link, whose flag is discarded.
    #[test]
    fn prop_chain_stops_at_first_failure(failures in prop::collection::vec(any::<bool>(), 1..8)) {
        let rt = tokio::runtime::Runtime::new().map_err(fail_case)?;
        rt.block_on(async {
            let store = Arc::new(SurrealFactStore::in_memory().await.map_err(fail_case)?);
            let bus = chain(&failures)
                .into_iter()
                .fold(EventBusBuilder::new().with_store(store.clone()), |builder, link| {
                    builder.register(link)
                })
                .build()
                .map_err(fail_case)?;

            let report = bus.dispatch(Trigger::Update).await.map_err(fail_case)?;
            let completed = failures.iter().take_while(|fail| !**fail).count();

            let expected: Vec<String> = (0..completed).map(|i| format!("link-{i}")).collect();
            prop_assert_eq!(report.executed(), expected.iter().map(String::as_str).collect::<Vec<_>>());
            prop_assert!(!report.truncated);

            for index in 0..failures.len() {
                let ran = report.passes.iter().filter(|pass| pass.ran(&format!("link-{index}"))).count();
                prop_assert!(ran <= 1, "link-{} ran {} times", index, ran);
            }

            let flags = store.flags().await.map_err(fail_case)?;
            for index in 0..failures.len() {
                prop_assert_eq!(flags.is_set(&step(index)), index < completed);
            }
            if completed < failures.len() {
                let visited = store.get(&format!("visited.{completed}")).await.map_err(fail_case)?;
                prop_assert_eq!(visited.as_deref(), Some("yes"));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
