use log::info;

use super::{
    errors::{HeError, HeResult},
    params::{HeParams, Scheme},
};
use crate::rns::{
    BaseConverter, ContextChain, Dims, GAMMA, RingContext, RnsResult, ShoupModulus,
    divide_and_round_scratch_words, exact_scratch_words, mod_drop_scratch_words,
    setup::{product, wide_div_rem},
};

/// Tables for ciphertexts over `q_0, ..., q_{k-1}`.
#[derive(Debug)]
pub(super) struct Level {
    pub(super) ctx: RingContext,
    /// BFV: `ctx -> [t, GAMMA]` for divide-and-round. BGV: `ctx -> [t]` for
    /// exact conversion and modulus drop.
    pub(super) converter: BaseConverter,
    /// BFV only: `floor(Q_k / t) mod q_i`.
    pub(super) delta: Vec<ShoupModulus>,
}

/// Everything derived from [`HeParams`] once, shared by all operations.
#[derive(Debug)]
pub struct HeContext {
    params: HeParams,
    chain: ContextChain,
    plain: RingContext,
    levels: Vec<Level>,
}

impl HeContext {
    pub fn new(params: HeParams) -> HeResult<Self> {
        params.validate()?;
        let chain = ContextChain::new(params.degree, &params.moduli)?;
        let t = params.plaintext_modulus;
        let plain = RingContext::new(params.degree, &[t])?;
        let target = match params.scheme {
            Scheme::Bfv => RingContext::new(params.degree, &[t, GAMMA])?,
            Scheme::Bgv => plain.clone(),
        };

        let mut levels = Vec::with_capacity(chain.max_nmoduli());
        for nmoduli in 1..=chain.max_nmoduli() {
            let ctx = chain.context(nmoduli)?;
            let converter = BaseConverter::new(&ctx, &target)?;
            let delta = match params.scheme {
                Scheme::Bfv => {
                    let q = &params.moduli[..nmoduli];
                    let big_q = product(q, None);
                    q.iter()
                        .map(|&q_i| ShoupModulus::new(wide_div_rem(&big_q, t, q_i)?, q_i))
                        .collect::<RnsResult<_>>()?
                }
                Scheme::Bgv => Vec::new(),
            };
            levels.push(Level {
                ctx,
                converter,
                delta,
            });
        }

        info!(
            "built {:?} context: degree {}, t = {}, {} levels",
            params.scheme,
            params.degree,
            t,
            levels.len()
        );
        Ok(Self {
            params,
            chain,
            plain,
            levels,
        })
    }

    pub fn params(&self) -> &HeParams {
        &self.params
    }

    pub fn scheme(&self) -> Scheme {
        self.params.scheme
    }

    pub fn plaintext_modulus(&self) -> u64 {
        self.params.plaintext_modulus
    }

    pub fn max_level(&self) -> usize {
        self.chain.max_nmoduli()
    }

    pub fn chain(&self) -> &ContextChain {
        &self.chain
    }

    pub fn plaintext_context(&self) -> &RingContext {
        &self.plain
    }

    /// Ring context of level `level`, i.e. the first `level` moduli.
    pub fn context(&self, level: usize) -> HeResult<&RingContext> {
        Ok(&self.level(level)?.ctx)
    }

    pub(super) fn level(&self, level: usize) -> HeResult<&Level> {
        level
            .checked_sub(1)
            .and_then(|index| self.levels.get(index))
            .ok_or(HeError::InvalidLevel {
                level,
                max: self.levels.len(),
            })
    }

    /// Workspace words [`decrypt`](Self::decrypt) needs at `level`.
    pub fn decrypt_workspace_words(&self, level: usize) -> HeResult<usize> {
        let dims = self.level(level)?.ctx.dims();
        let conversion = match self.scheme() {
            Scheme::Bfv => divide_and_round_scratch_words(dims),
            Scheme::Bgv => exact_scratch_words(dims),
        };
        Ok(dims.words() + Dims::new(dims.degree, 1).words() + conversion)
    }

    /// Workspace words [`mod_switch_down`](Self::mod_switch_down) needs at
    /// `level`.
    pub fn mod_switch_workspace_words(&self, level: usize) -> HeResult<usize> {
        let dims = self.level(level)?.ctx.dims();
        Ok(match self.scheme() {
            Scheme::Bfv => 0,
            Scheme::Bgv => mod_drop_scratch_words(dims),
        })
    }
}
