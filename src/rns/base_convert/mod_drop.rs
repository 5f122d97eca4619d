use super::{BaseConverter, required};
use crate::rns::{
    context::Dims,
    errors::{RnsError, RnsResult},
    poly::{Eval, Poly, Storage},
    workspace::Scratch,
};

/// Scratch words needed by [`BaseConverter::mod_drop_rescale`]: the dropped
/// row in coefficient form, the correction modulo `t`, and one correction
/// row modulo the current `q_i`.
pub fn mod_drop_scratch_words(input: Dims) -> usize {
    3 * input.degree
}

impl BaseConverter {
    /// Drops `q_last` from an evaluation-form polynomial while keeping its
    /// residue modulo `t = t_0`.
    ///
    /// With `b = [x]_{q_last}`, the correction `D = b + q_last * [-b /
    /// q_last]_t` satisfies `D = b (mod q_last)` and `D = 0 (mod t)`, so
    /// `x' = (x - D) / q_last` is exact and `x' = x * q_last^-1 (mod t)`.
    /// Callers track that factor with
    /// [`scale_inv_q_last_mod_t`](Self::scale_inv_q_last_mod_t).
    pub fn mod_drop_rescale<S: Storage>(
        &self,
        scratch: &mut Scratch<'_>,
        mut x: Poly<Eval, S>,
    ) -> RnsResult<Poly<Eval, S>> {
        self.expect_input(x.context())?;
        let ctx = x.context().clone();
        let next = ctx.next().ok_or(RnsError::NoNextContext {
            nmoduli: ctx.nmoduli(),
        })?;
        let inv_q_last_mod_t = required(&self.inv_q_last_mod_t0, "inv_q_last_mod_t0")?;
        let t = *self.output.modulus(0);
        let degree = ctx.degree();
        let last = ctx.nmoduli() - 1;

        let mut scope = scratch.scope();
        let x_last = scope.alloc(degree)?;
        let delta_t = scope.alloc(degree)?;
        let delta_q = scope.alloc(degree)?;

        x_last.copy_from_slice(x.residues(last));
        ctx.ntt_table(last)?.inverse(x_last);

        for (dst, &b) in delta_t.iter_mut().zip(x_last.iter()) {
            // t - [b]_t lies in (0, t], which the lazy Shoup input range covers.
            *dst = inv_q_last_mod_t.multiply_reduce(t.value() - t.reduce(b));
        }

        for index in 0..last {
            let q_i = ctx.modulus(index);
            let q_last_mod_q_i = &self.q_last_mod_q[index];
            for ((dst, &d_t), &b) in delta_q.iter_mut().zip(delta_t.iter()).zip(x_last.iter()) {
                let scaled = q_last_mod_q_i.multiply_reduce(q_i.reduce(d_t));
                *dst = q_i.add(scaled, q_i.reduce(b));
            }
            ctx.ntt_table(index)?.forward(delta_q);

            let inv_q_last = &self.inv_q_last_mod_q[index];
            for (value, &d) in x.residues_mut(index).iter_mut().zip(delta_q.iter()) {
                *value = inv_q_last.multiply_reduce(q_i.sub(*value, d));
            }
        }

        x.shrink_to(next);
        Ok(x)
    }
}
