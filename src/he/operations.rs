use rand::Rng;

use super::{
    context::{HeContext, Level},
    errors::{HeError, HeResult},
    keys::SecretKey,
    params::Scheme,
    types::{Ciphertext, Plaintext},
};
use crate::{
    math::{gaussian_coefficients, uniform_residues},
    rns::{Coeff, CoeffPoly, RnsError, Workspace, setup::inv_mod},
};

impl HeContext {
    /// Symmetric encryption at the top level.
    ///
    /// BFV: `c0 = floor(Q / t) * m + e - a * s`. BGV: `c0 = m + t * e - a * s`.
    /// In both cases `c1 = a` is uniform and the correction factor is 1.
    pub fn encrypt_symmetric<R: Rng + ?Sized>(
        &self,
        sk: &SecretKey,
        pt: &Plaintext,
        rng: &mut R,
    ) -> HeResult<Ciphertext> {
        let level = self.level(self.max_level())?;
        let ctx = &level.ctx;
        let degree = ctx.degree();
        let std_dev = self.params().error_std_dev;

        let mut a_residues = Vec::with_capacity(ctx.dims().words());
        for q in ctx.modulus_values() {
            a_residues.extend(uniform_residues(q, degree, rng));
        }
        let a = CoeffPoly::from_residues(ctx, a_residues)?;
        let noise = gaussian_coefficients(std_dev, degree, rng)
            .ok_or(HeError::InvalidStdDev { std_dev })?;

        let mut c0 = CoeffPoly::from_signed(ctx, &noise)?;
        let message = CoeffPoly::from_unsigned(ctx, pt.coeffs())?;
        match self.scheme() {
            Scheme::Bfv => {
                let mut scaled = message;
                scaled.mul_rns_scalar_assign(&level.delta)?;
                c0.add_assign(&scaled)?;
            }
            Scheme::Bgv => {
                c0.mul_scalar_assign(self.plaintext_modulus());
                c0.add_assign(&message)?;
            }
        }

        let mut a_s = a.to_owned_poly().forward_transform()?;
        a_s.mul_assign(sk.at_level(ctx.nmoduli())?)?;
        c0.sub_assign(&a_s.inverse_transform()?)?;
        Ciphertext::new(c0, a, 1)
    }

    /// Recovers `m` from `ct`.
    ///
    /// Computes `x = c0 + c1 * s` in the workspace, maps it to `Z_t` with
    /// divide-and-round (BFV) or exact conversion (BGV) and removes the
    /// correction factor. `workspace` must hold at least
    /// [`decrypt_workspace_words`](Self::decrypt_workspace_words) words for
    /// the ciphertext's level.
    pub fn decrypt(
        &self,
        sk: &SecretKey,
        ct: &Ciphertext,
        workspace: &mut Workspace,
    ) -> HeResult<Plaintext> {
        let level = self.level_of(ct)?;
        let t = self.plaintext_modulus();
        let inv_factor =
            inv_mod(ct.correction_factor, t).ok_or(HeError::NonInvertibleCorrectionFactor {
                factor: ct.correction_factor,
                modulus: t,
            })?;

        let mut scratch = workspace.scratch();
        let mut c1 = scratch.alloc_poly::<Coeff>(&level.ctx)?;
        c1.copy_from(&ct.c1)?;
        let mut x = c1.forward_transform()?;
        x.mul_assign(sk.at_level(ct.level())?)?;
        let mut x = x.inverse_transform()?;
        x.add_assign(&ct.c0)?;

        let mut out = scratch.alloc_poly::<Coeff>(self.plaintext_context())?;
        match self.scheme() {
            Scheme::Bfv => level.converter.divide_and_round(&mut scratch, &mut out, &x)?,
            Scheme::Bgv => level.converter.convert_exact(&mut scratch, &mut out, &x)?,
        }
        out.mul_scalar_assign(inv_factor);
        Ok(Plaintext::from_reduced(out.residues(0).to_vec()))
    }

    /// Moves `ct` one level down the chain, dropping `q_last`.
    ///
    /// BFV rounds both components by `q_last`. BGV subtracts the multiple of
    /// `q_last` that keeps the message modulo `t`, divides exactly and folds
    /// `q_last^-1` into the correction factor.
    pub fn mod_switch_down(
        &self,
        ct: Ciphertext,
        workspace: &mut Workspace,
    ) -> HeResult<Ciphertext> {
        let level = self.level_of(&ct)?;
        if ct.level() == 1 {
            return Err(HeError::LowestLevel);
        }
        let Ciphertext {
            c0,
            c1,
            correction_factor,
        } = ct;
        match self.scheme() {
            Scheme::Bfv => Ciphertext::new(
                c0.divide_and_round_q_last()?,
                c1.divide_and_round_q_last()?,
                correction_factor,
            ),
            Scheme::Bgv => {
                let mut scratch = workspace.scratch();
                let converter = &level.converter;
                let c0 = converter
                    .mod_drop_rescale(&mut scratch, c0.forward_transform()?)?
                    .inverse_transform()?;
                let c1 = converter
                    .mod_drop_rescale(&mut scratch, c1.forward_transform()?)?
                    .inverse_transform()?;
                let correction_factor = converter.scale_inv_q_last_mod_t(correction_factor)?;
                Ciphertext::new(c0, c1, correction_factor)
            }
        }
    }

    fn level_of(&self, ct: &Ciphertext) -> HeResult<&Level> {
        let level = self.level(ct.level())?;
        if ct.c0.context() != &level.ctx {
            return Err(RnsError::ContextMismatch {
                operand: "ciphertext",
            }
            .into());
        }
        Ok(level)
    }
}
