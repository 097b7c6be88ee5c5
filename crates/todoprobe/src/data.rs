//! Randomized test data.
//!
//! All randomness flows through [`ScenarioRng`]. A run has one seed; each
//! scenario derives its own stream from that seed and its name, so scenarios
//! running concurrently never share a generator and any run can be replayed
//! with `--seed`.

use crate::navigation::TodoActions;
use crate::result::ProbeResult;
use crate::scenario::FixtureState;
use crate::session::Session;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

const ADJECTIVES: &[&str] = &[
    "Awesome", "Elegant", "Ergonomic", "Fantastic", "Generic", "Gorgeous", "Handcrafted",
    "Handmade", "Incredible", "Intelligent", "Licensed", "Practical", "Refined", "Rustic",
    "Sleek", "Small", "Tasty", "Unbranded",
];

const MATERIALS: &[&str] = &[
    "Bamboo", "Bronze", "Concrete", "Cotton", "Fresh", "Frozen", "Granite", "Metal", "Plastic",
    "Rubber", "Soft", "Steel", "Wooden",
];

const PRODUCTS: &[&str] = &[
    "Bacon", "Ball", "Bike", "Car", "Chair", "Cheese", "Chicken", "Chips", "Computer", "Desk",
    "Fish", "Gloves", "Hat", "Keyboard", "Lamp", "Mouse", "Pants", "Pizza", "Salad", "Sausages",
    "Shirt", "Shoes", "Soap", "Table", "Towels", "Tuna",
];

/// Fresh seed for a run that was not given one
#[must_use]
pub fn random_run_seed() -> u64 {
    rand::random()
}

/// Seedable random source owned by one scenario
#[derive(Debug, Clone)]
pub struct ScenarioRng {
    seed: u64,
    rng: StdRng,
}

impl ScenarioRng {
    /// Stream starting from `seed`
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream for `scenario` within the run seeded by `run_seed`
    #[must_use]
    pub fn derive(run_seed: u64, scenario: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(run_seed.to_le_bytes());
        hasher.update(scenario.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self::from_seed(u64::from_le_bytes(bytes))
    }

    /// Seed this stream started from
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Fair coin: draws 0 or 1 uniformly, heads on 1
    pub fn coin_flip(&mut self) -> bool {
        self.rng.gen_range(0..=1u8) == 1
    }

    /// Uniform index in `0..len`, `None` when `len` is zero
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    /// Product-like name, `<adjective> <material> <product>`
    pub fn item_name(&mut self) -> String {
        format!(
            "{} {} {}",
            self.pick(ADJECTIVES),
            self.pick(MATERIALS),
            self.pick(PRODUCTS)
        )
    }

    fn pick(&mut self, words: &[&'static str]) -> &'static str {
        words[self.rng.gen_range(0..words.len())]
    }
}

/// Data helpers bound to one scenario
#[derive(Debug)]
pub struct DataUtils<'a> {
    session: &'a mut Session,
    rng: &'a mut ScenarioRng,
    fixture: &'a mut FixtureState,
}

impl<'a> DataUtils<'a> {
    /// Bind helpers to a scenario's session, generator and counters
    pub fn new(
        session: &'a mut Session,
        rng: &'a mut ScenarioRng,
        fixture: &'a mut FixtureState,
    ) -> Self {
        Self {
            session,
            rng,
            fixture,
        }
    }

    /// A fresh generated item name
    pub fn generate_item_name(&mut self) -> String {
        self.rng.item_name()
    }

    /// A uniform position in `0..len`, `None` for an empty range
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        self.rng.pick_index(len)
    }

    /// Add `count` generated items one after another.
    ///
    /// Not transactional: if an add fails, the items added before it stay
    /// and are already counted in the fixture.
    pub async fn populate(&mut self, count: usize) -> ProbeResult<Vec<String>> {
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.rng.item_name();
            TodoActions::new(&mut *self.session).add_item(&name).await?;
            self.fixture.item_count += 1;
            names.push(name);
        }
        debug!(count, "populated list");
        Ok(names)
    }

    /// Flip a coin for each of the first `count` rows and complete the heads.
    ///
    /// Returns how many rows were marked.
    pub async fn mark_random_subset_completed(&mut self, count: usize) -> ProbeResult<usize> {
        let mut marked = 0;
        for index in 0..count {
            if self.rng.coin_flip() {
                TodoActions::new(&mut *self.session)
                    .set_item_completed(index, true)
                    .await?;
                self.fixture.completed_count += 1;
                marked += 1;
            }
        }
        debug!(count, marked, "marked random subset");
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod rng_tests {
        use super::*;

        #[test]
        fn test_same_seed_same_stream() {
            let mut a = ScenarioRng::from_seed(7);
            let mut b = ScenarioRng::from_seed(7);
            for _ in 0..20 {
                assert_eq!(a.item_name(), b.item_name());
                assert_eq!(a.coin_flip(), b.coin_flip());
            }
        }

        #[test]
        fn test_derive_separates_scenarios() {
            let a = ScenarioRng::derive(42, "Filtering by completed items");
            let b = ScenarioRng::derive(42, "Filtering by active items");
            let again = ScenarioRng::derive(42, "Filtering by completed items");
            assert_ne!(a.seed(), b.seed());
            assert_eq!(a.seed(), again.seed());
        }

        #[test]
        fn test_pick_index_empty_range() {
            let mut rng = ScenarioRng::from_seed(1);
            assert_eq!(rng.pick_index(0), None);
            assert_eq!(rng.pick_index(1), Some(0));
        }

        #[test]
        fn test_coin_is_roughly_fair() {
            let mut rng = ScenarioRng::from_seed(2024);
            let heads = (0..2000).filter(|_| rng.coin_flip()).count();
            assert!((800..1200).contains(&heads), "heads = {heads}");
        }
    }

    proptest! {
        #[test]
        fn prop_item_names_are_three_words(seed in any::<u64>()) {
            let mut rng = ScenarioRng::from_seed(seed);
            let name = rng.item_name();
            prop_assert!(!name.trim().is_empty());
            prop_assert_eq!(name.split(' ').count(), 3);
        }

        #[test]
        fn prop_pick_index_in_range(seed in any::<u64>(), len in 1usize..64) {
            let mut rng = ScenarioRng::from_seed(seed);
            let index = rng.pick_index(len);
            prop_assert!(index.is_some_and(|i| i < len));
        }
    }

    mod utils_tests {
        use super::*;
        use crate::driver::Timeouts;
        use crate::mock::{InMemoryDriver, TodoApp};
        use crate::page::TodoPage;

        async fn session() -> Session {
            let mut session = Session::new(
                Box::new(InMemoryDriver::new(TodoApp::new())),
                Timeouts::fast(),
            );
            session.goto("https://todo.test/#/").await.unwrap();
            session
        }

        #[tokio::test]
        async fn test_populate_tracks_fixture() {
            let mut session = session().await;
            let mut rng = ScenarioRng::from_seed(3);
            let mut fixture = FixtureState::default();
            let names = DataUtils::new(&mut session, &mut rng, &mut fixture)
                .populate(5)
                .await
                .unwrap();
            assert_eq!(names.len(), 5);
            assert_eq!(fixture.item_count, 5);
            assert_eq!(session.count(&TodoPage::todo_items()).await.unwrap(), 5);
        }

        #[tokio::test]
        async fn test_marked_count_matches_page() {
            for seed in 0..8 {
                let mut session = session().await;
                let mut rng = ScenarioRng::from_seed(seed);
                let mut fixture = FixtureState::default();
                let mut data = DataUtils::new(&mut session, &mut rng, &mut fixture);
                let _ = data.populate(5).await.unwrap();
                let marked = data.mark_random_subset_completed(5).await.unwrap();
                assert!(marked <= 5);
                assert_eq!(fixture.completed_count, marked);

                let checked = session
                    .query(&TodoPage::item_toggles())
                    .await
                    .unwrap()
                    .into_iter()
                    .filter(|s| s.checked == Some(true))
                    .count();
                assert_eq!(checked, marked);
            }
        }
    }
}
