pub mod errors;

pub use errors::{FailedJob, WindingError, WindingErrorCategory, WindingResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Material configuration of one lineage of a sweep. The air variant is the
/// reference measurement; the core variant carries the test material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Air,
    Core,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Air, Variant::Core];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Core => "core",
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One value per variant lineage, kept side by side so the two can never be
/// paired up by position in a flat list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantPair<T> {
    pub air: T,
    pub core: T,
}

impl<T> VariantPair<T> {
    pub fn new(air: T, core: T) -> Self {
        Self { air, core }
    }

    pub fn get(&self, variant: Variant) -> &T {
        match variant {
            Variant::Air => &self.air,
            Variant::Core => &self.core,
        }
    }

    pub fn get_mut(&mut self, variant: Variant) -> &mut T {
        match variant {
            Variant::Air => &mut self.air,
            Variant::Core => &mut self.core,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Variant, T) -> U) -> VariantPair<U> {
        VariantPair {
            air: f(Variant::Air, self.air),
            core: f(Variant::Core, self.core),
        }
    }

    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(Variant, T) -> Result<U, E>,
    ) -> Result<VariantPair<U>, E> {
        Ok(VariantPair {
            air: f(Variant::Air, self.air)?,
            core: f(Variant::Core, self.core)?,
        })
    }

    pub fn as_ref(&self) -> VariantPair<&T> {
        VariantPair {
            air: &self.air,
            core: &self.core,
        }
    }
}
