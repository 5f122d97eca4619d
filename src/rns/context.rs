use std::{fmt, sync::Arc};

use log::debug;
use once_cell::sync::OnceCell;

use super::{
    errors::{RnsError, RnsResult},
    ntt::NttTable,
    scalar::{Modulus, ShoupModulus},
    setup::inv_mod,
};
use crate::math::is_ntt_friendly_prime;

pub const DEGREE_MAX: usize = 1 << 20;
pub const NMODULI_MAX: usize = 10;

/// Shape of a polynomial: ring degree `N` and number of RNS moduli `L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    pub degree: usize,
    pub nmoduli: usize,
}

impl Dims {
    pub fn new(degree: usize, nmoduli: usize) -> Self {
        Self { degree, nmoduli }
    }

    /// Number of `u64` words a polynomial of this shape occupies.
    pub fn words(&self) -> usize {
        self.degree * self.nmoduli
    }
}

/// Constants for `round(x / q_last)` at one level of a chain.
#[derive(Debug, Clone)]
pub(super) struct RescaleTables {
    pub(super) q_last_half: u64,
    pub(super) q_last_half_mod_q: Vec<u64>,
    pub(super) inv_q_last_mod_q: Vec<ShoupModulus>,
}

/// Storage shared by every level of one basis.
struct BasisTables {
    degree: usize,
    moduli: Vec<Modulus>,
    /// Built on first use for standalone contexts, up front for chains.
    ntt: Vec<OnceCell<Option<NttTable>>>,
    chained: bool,
    /// `rescale[k]` serves the level with `k + 1` moduli; absent for `k == 0`.
    rescale: Vec<Option<RescaleTables>>,
}

impl fmt::Debug for BasisTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasisTables")
            .field("degree", &self.degree)
            .field(
                "moduli",
                &self.moduli.iter().map(Modulus::value).collect::<Vec<_>>(),
            )
            .field("chained", &self.chained)
            .finish()
    }
}

/// One RNS basis `q_0, ..., q_{L-1}` for a fixed ring degree.
///
/// A context is a view of the first `nmoduli` entries of a shared table, so
/// cloning is cheap and every level of a [`ContextChain`] shares one
/// allocation. Equality compares the degree and the ordered modulus values.
#[derive(Clone)]
pub struct RingContext {
    tables: Arc<BasisTables>,
    nmoduli: usize,
}

impl RingContext {
    /// Builds a standalone context. Moduli need not be NTT-friendly; the
    /// transforms report a configuration error when they are not. NTT tables
    /// are only built when a transform first needs them.
    pub fn new(degree: usize, moduli: &[u64]) -> RnsResult<Self> {
        let tables = BasisTables::build(degree, moduli, false)?;
        Ok(Self {
            nmoduli: moduli.len(),
            tables: Arc::new(tables),
        })
    }

    pub fn degree(&self) -> usize {
        self.tables.degree
    }

    pub fn nmoduli(&self) -> usize {
        self.nmoduli
    }

    pub fn dims(&self) -> Dims {
        Dims::new(self.degree(), self.nmoduli)
    }

    pub fn moduli(&self) -> &[Modulus] {
        &self.tables.moduli[..self.nmoduli]
    }

    pub fn modulus(&self, index: usize) -> &Modulus {
        &self.moduli()[index]
    }

    pub fn modulus_values(&self) -> impl Iterator<Item = u64> + '_ {
        self.moduli().iter().map(Modulus::value)
    }

    /// The last modulus of this level.
    pub fn q_last(&self) -> &Modulus {
        self.modulus(self.nmoduli - 1)
    }

    pub fn is_ntt_friendly(&self) -> bool {
        let degree = self.degree() as u64;
        self.modulus_values().all(|q| is_ntt_friendly_prime(q, degree))
    }

    pub fn ntt_table(&self, index: usize) -> RnsResult<&NttTable> {
        let modulus = self.modulus(index).value();
        self.tables.ntt_table(index).ok_or(RnsError::NonNttFriendlyModulus {
            modulus,
            degree: self.degree(),
        })
    }

    /// The context with the last modulus dropped, when this context belongs
    /// to a chain and has at least two moduli.
    pub fn next(&self) -> Option<RingContext> {
        (self.tables.chained && self.nmoduli >= 2).then(|| Self {
            tables: Arc::clone(&self.tables),
            nmoduli: self.nmoduli - 1,
        })
    }

    pub(super) fn rescale_tables(&self) -> RnsResult<&RescaleTables> {
        self.tables
            .rescale
            .get(self.nmoduli - 1)
            .and_then(Option::as_ref)
            .filter(|_| self.tables.chained)
            .ok_or(RnsError::NoNextContext {
                nmoduli: self.nmoduli,
            })
    }

    /// Whether `other` is this context with trailing moduli removed.
    pub fn has_prefix(&self, other: &RingContext) -> bool {
        self.degree() == other.degree()
            && other.nmoduli <= self.nmoduli
            && self.moduli()[..other.nmoduli]
                .iter()
                .zip(other.moduli())
                .all(|(a, b)| a.value() == b.value())
    }
}

impl PartialEq for RingContext {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.tables, &other.tables) {
            return self.nmoduli == other.nmoduli;
        }
        self.degree() == other.degree() && self.modulus_values().eq(other.modulus_values())
    }
}

impl Eq for RingContext {}

impl fmt::Debug for RingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingContext")
            .field("degree", &self.degree())
            .field("moduli", &self.modulus_values().collect::<Vec<_>>())
            .finish()
    }
}

/// Every level of one modulus chain, indexed by modulus count.
///
/// Level `k` holds `q_0, ..., q_{k-1}`. All moduli must be NTT-friendly so
/// that modulus switching can move between levels in evaluation form.
#[derive(Debug, Clone)]
pub struct ContextChain {
    top: RingContext,
}

impl ContextChain {
    pub fn new(degree: usize, moduli: &[u64]) -> RnsResult<Self> {
        let tables = BasisTables::build(degree, moduli, true)?;
        let missing = (0..moduli.len()).find(|&index| tables.ntt_table(index).is_none());
        if let Some(index) = missing {
            return Err(RnsError::NonNttFriendlyModulus {
                modulus: moduli[index],
                degree,
            });
        }
        debug!("built context chain: degree {degree}, {} levels", moduli.len());
        Ok(Self {
            top: RingContext {
                nmoduli: moduli.len(),
                tables: Arc::new(tables),
            },
        })
    }

    pub fn max_nmoduli(&self) -> usize {
        self.top.nmoduli
    }

    pub fn top(&self) -> &RingContext {
        &self.top
    }

    /// The sub-context with exactly `nmoduli` moduli.
    pub fn context(&self, nmoduli: usize) -> RnsResult<RingContext> {
        if nmoduli == 0 || nmoduli > self.top.nmoduli {
            return Err(RnsError::ModulusCountMismatch {
                expected: self.top.nmoduli,
                actual: nmoduli,
            });
        }
        Ok(RingContext {
            tables: Arc::clone(&self.top.tables),
            nmoduli,
        })
    }
}

// ─── Validation and table construction ────────────────────────────────────────

impl BasisTables {
    fn build(degree: usize, moduli: &[u64], chained: bool) -> RnsResult<Self> {
        if !degree.is_power_of_two() || degree > DEGREE_MAX {
            return Err(RnsError::InvalidDegree {
                degree,
                max: DEGREE_MAX,
            });
        }
        if moduli.is_empty() || moduli.len() > NMODULI_MAX {
            return Err(RnsError::InvalidModulusCount {
                nmoduli: moduli.len(),
                max: NMODULI_MAX,
            });
        }
        let mut validated = Vec::with_capacity(moduli.len());
        for (index, &value) in moduli.iter().enumerate() {
            if moduli[..index].contains(&value) {
                return Err(RnsError::DuplicateModulus { modulus: value });
            }
            validated.push(Modulus::new(value)?);
        }

        let ntt = (0..validated.len()).map(|_| OnceCell::new()).collect();
        let rescale = if chained {
            (0..moduli.len())
                .map(|level| match level {
                    0 => Ok(None),
                    _ => RescaleTables::build(&moduli[..=level]).map(Some),
                })
                .collect::<RnsResult<_>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            degree,
            moduli: validated,
            ntt,
            chained,
            rescale,
        })
    }

    fn ntt_table(&self, index: usize) -> Option<&NttTable> {
        self.ntt[index]
            .get_or_init(|| NttTable::new(self.moduli[index], self.degree).ok())
            .as_ref()
    }
}

impl RescaleTables {
    fn build(moduli: &[u64]) -> RnsResult<Self> {
        let (&q_last, rest) = moduli
            .split_last()
            .ok_or(RnsError::InvalidModulusCount {
                nmoduli: 0,
                max: NMODULI_MAX,
            })?;
        let q_last_half = q_last / 2;
        let mut q_last_half_mod_q = Vec::with_capacity(rest.len());
        let mut inv_q_last_mod_q = Vec::with_capacity(rest.len());
        for &q in rest {
            q_last_half_mod_q.push(q_last_half % q);
            let inverse = inv_mod(q_last, q).ok_or(RnsError::NotInvertible {
                value: q_last,
                modulus: q,
            })?;
            inv_q_last_mod_q.push(ShoupModulus::new(inverse, q)?);
        }
        Ok(Self {
            q_last_half,
            q_last_half_mod_q,
            inv_q_last_mod_q,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rns::errors::ErrorKind;

    #[test]
    fn rejects_bad_shapes() {
        let err = RingContext::new(6, &[17]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(
            RingContext::new(8, &[]),
            Err(RnsError::InvalidModulusCount { nmoduli: 0, .. })
        ));
        assert!(matches!(
            RingContext::new(8, &[17, 17]),
            Err(RnsError::DuplicateModulus { modulus: 17 })
        ));
        assert!(matches!(
            RingContext::new(2 * DEGREE_MAX, &[17]),
            Err(RnsError::InvalidDegree { .. })
        ));
    }

    #[test]
    fn standalone_context_allows_non_friendly_moduli() {
        let ctx = RingContext::new(4, &[19, 23]).unwrap();
        assert!(!ctx.is_ntt_friendly());
        assert!(ctx.ntt_table(0).is_err());
        assert!(ctx.next().is_none());
    }

    #[test]
    fn standalone_ntt_tables_are_built_on_first_transform() {
        let ctx = RingContext::new(8, &[17, 97]).unwrap();
        assert!(ctx.is_ntt_friendly());
        assert!(ctx.tables.ntt.iter().all(|cell| cell.get().is_none()));
        ctx.ntt_table(1).unwrap();
        assert!(ctx.tables.ntt[0].get().is_none());
        assert!(ctx.tables.ntt[1].get().is_some());

        let chain = ContextChain::new(8, &[17, 97]).unwrap();
        assert!(chain.top().tables.ntt.iter().all(|cell| cell.get().is_some()));
    }

    #[test]
    fn chain_requires_friendly_moduli() {
        assert!(matches!(
            ContextChain::new(8, &[17, 19]),
            Err(RnsError::NonNttFriendlyModulus { modulus: 19, .. })
        ));
    }

    #[test]
    fn chain_levels_drop_last_modulus() {
        let chain = ContextChain::new(8, &[17, 97, 113]).unwrap();
        let top = chain.top().clone();
        let middle = top.next().unwrap();
        let bottom = middle.next().unwrap();
        assert_eq!(middle.modulus_values().collect::<Vec<_>>(), vec![17, 97]);
        assert_eq!(bottom.modulus_values().collect::<Vec<_>>(), vec![17]);
        assert!(bottom.next().is_none());
        assert_eq!(chain.context(2).unwrap(), middle);
        assert!(chain.context(0).is_err());
        assert!(chain.context(4).is_err());
    }

    #[test]
    fn equality_is_by_value() {
        let chain = ContextChain::new(8, &[17, 97, 113]).unwrap();
        let standalone = RingContext::new(8, &[17, 97]).unwrap();
        assert_eq!(chain.context(2).unwrap(), standalone);
        assert_ne!(chain.context(3).unwrap(), standalone);
        assert_ne!(RingContext::new(16, &[17, 97]).unwrap(), standalone);
        assert_ne!(RingContext::new(8, &[97, 17]).unwrap(), standalone);
        assert!(chain.top().has_prefix(&standalone));
        assert!(!standalone.has_prefix(chain.top()));
    }

    #[test]
    fn rescale_tables_exist_below_the_top_only_for_chains() {
        let chain = ContextChain::new(8, &[17, 97, 113]).unwrap();
        let tables = chain.top().rescale_tables().unwrap();
        assert_eq!(tables.q_last_half, 56);
        assert_eq!(tables.inv_q_last_mod_q.len(), 2);
        assert!(chain.context(1).unwrap().rescale_tables().is_err());
        let standalone = RingContext::new(8, &[17, 97]).unwrap();
        assert!(standalone.rescale_tables().is_err());
    }
}
