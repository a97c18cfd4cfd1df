use std::sync::Mutex;

use cartchat_core::domain::product::{Platform, ProductId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maps a free-text product mention to a product id on the given platform.
pub trait ProductResolver: Send + Sync {
    fn resolve(&self, product_text: &str, platform: &Platform) -> ProductId;
}

/// Stand-in resolver that invents a plausibly shaped id per platform.
///
/// The ids do not correspond to real catalog entries; only their format is stable:
/// `NN-NNNN` on motonet, `P` plus six digits on rusta and `PROD-` plus five digits elsewhere.
pub struct SyntheticIdResolver {
    rng: Mutex<StdRng>,
}

impl Default for SyntheticIdResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticIdResolver {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    fn generate(rng: &mut StdRng, platform: &Platform) -> String {
        match platform {
            Platform::Motonet => {
                format!("{}-{}", rng.gen_range(10..=99), rng.gen_range(1000..=9999))
            }
            Platform::Rusta => format!("P{}", rng.gen_range(100_000..=999_999)),
            Platform::Other(_) => format!("PROD-{}", rng.gen_range(10_000..=99_999)),
        }
    }
}

impl ProductResolver for SyntheticIdResolver {
    fn resolve(&self, _product_text: &str, platform: &Platform) -> ProductId {
        let id = match self.rng.lock() {
            Ok(mut rng) => Self::generate(&mut rng, platform),
            Err(poisoned) => Self::generate(&mut poisoned.into_inner(), platform),
        };
        ProductId(id)
    }
}
