use std::{fmt, marker::PhantomData};

use super::{
    context::{Dims, RingContext},
    errors::{RnsError, RnsResult},
    scalar::{Modulus, ShoupModulus},
};

/// Coefficient-form marker: residues of each coefficient of `x(X)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coeff;

/// Evaluation-form marker: the negacyclic NTT of each residue vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eval;

pub trait Form: fmt::Debug + Copy + 'static {}
impl Form for Coeff {}
impl Form for Eval {}

/// Backing words of a polynomial: an owned `Vec` or an arena slice.
pub trait Storage: AsRef<[u64]> + AsMut<[u64]> {
    /// Keeps only the first `len` words.
    fn truncate_words(&mut self, len: usize);
}

impl Storage for Vec<u64> {
    fn truncate_words(&mut self, len: usize) {
        self.truncate(len);
    }
}

impl Storage for &mut [u64] {
    fn truncate_words(&mut self, len: usize) {
        let words = std::mem::take(self);
        *self = &mut words[..len];
    }
}

/// A polynomial in `Z_{q_0} x ... x Z_{q_{L-1}}[X] / (X^N + 1)`.
///
/// Residues are stored modulus-major: word `i * N + j` holds coefficient `j`
/// modulo `q_i`.
///
/// # Invariants
/// - `data.len() == ctx.degree() * ctx.nmoduli()`
/// - every residue of row `i` is below `q_i`
#[derive(Clone)]
pub struct Poly<F: Form, S: Storage = Vec<u64>> {
    ctx: RingContext,
    data: S,
    _form: PhantomData<F>,
}

pub type CoeffPoly<S = Vec<u64>> = Poly<Coeff, S>;
pub type EvalPoly<S = Vec<u64>> = Poly<Eval, S>;

// ─── Constructors ─────────────────────────────────────────────────────────────

impl<F: Form> Poly<F, Vec<u64>> {
    pub fn zero(ctx: &RingContext) -> Self {
        Self {
            data: vec![0; ctx.dims().words()],
            ctx: ctx.clone(),
            _form: PhantomData,
        }
    }

    /// Takes ownership of `residues`, rejecting wrong lengths and unreduced
    /// words.
    pub fn from_residues(ctx: &RingContext, residues: Vec<u64>) -> RnsResult<Self> {
        Self::from_storage(ctx, residues)
    }
}

impl<F: Form, S: Storage> Poly<F, S> {
    /// Wraps existing words after checking shape and reducedness.
    pub fn from_storage(ctx: &RingContext, data: S) -> RnsResult<Self> {
        let poly = Self::zeroable(ctx, data)?;
        for (index, modulus) in poly.ctx.moduli().iter().enumerate() {
            if let Some(&residue) = poly.residues(index).iter().find(|&&r| r >= modulus.value()) {
                return Err(RnsError::NonReducedResidue {
                    residue,
                    modulus: modulus.value(),
                });
            }
        }
        Ok(poly)
    }

    /// Wraps `data` and clears it to the zero polynomial.
    pub fn zeroed_in(ctx: &RingContext, data: S) -> RnsResult<Self> {
        let mut poly = Self::zeroable(ctx, data)?;
        poly.data.as_mut().fill(0);
        Ok(poly)
    }

    fn zeroable(ctx: &RingContext, data: S) -> RnsResult<Self> {
        let expected = ctx.dims().words();
        let actual = data.as_ref().len();
        if actual != expected {
            return Err(RnsError::LengthMismatch { expected, actual });
        }
        Ok(Self {
            ctx: ctx.clone(),
            data,
            _form: PhantomData,
        })
    }

    // Caller guarantees the storage already satisfies the invariants.
    pub(super) fn from_parts_unchecked(ctx: RingContext, data: S) -> Self {
        debug_assert_eq!(data.as_ref().len(), ctx.dims().words());
        Self {
            ctx,
            data,
            _form: PhantomData,
        }
    }

    pub(super) fn into_parts(self) -> (RingContext, S) {
        (self.ctx, self.data)
    }
}

impl Poly<Coeff, Vec<u64>> {
    /// Encodes signed integer coefficients; missing trailing coefficients
    /// are zero.
    pub fn from_signed(ctx: &RingContext, coeffs: &[i64]) -> RnsResult<Self> {
        let degree = ctx.degree();
        if coeffs.len() > degree {
            return Err(RnsError::DegreeMismatch {
                expected: degree,
                actual: coeffs.len(),
            });
        }
        let mut poly = Self::zero(ctx);
        for index in 0..ctx.nmoduli() {
            let q = ctx.modulus(index).value() as i128;
            for (dst, &coeff) in poly.residues_mut(index).iter_mut().zip(coeffs) {
                *dst = (coeff as i128).rem_euclid(q) as u64;
            }
        }
        Ok(poly)
    }

    /// Encodes unsigned coefficients, reducing each one modulo every `q_i`.
    pub fn from_unsigned(ctx: &RingContext, coeffs: &[u64]) -> RnsResult<Self> {
        let degree = ctx.degree();
        if coeffs.len() > degree {
            return Err(RnsError::DegreeMismatch {
                expected: degree,
                actual: coeffs.len(),
            });
        }
        let mut poly = Self::zero(ctx);
        for index in 0..ctx.nmoduli() {
            let modulus = *ctx.modulus(index);
            for (dst, &coeff) in poly.residues_mut(index).iter_mut().zip(coeffs) {
                *dst = modulus.reduce(coeff);
            }
        }
        Ok(poly)
    }
}

// ─── Accessors ────────────────────────────────────────────────────────────────

impl<F: Form, S: Storage> Poly<F, S> {
    pub fn context(&self) -> &RingContext {
        &self.ctx
    }

    pub fn dims(&self) -> Dims {
        self.ctx.dims()
    }

    pub fn degree(&self) -> usize {
        self.ctx.degree()
    }

    pub fn data(&self) -> &[u64] {
        self.data.as_ref()
    }

    /// Residues of every coefficient modulo `q_index`.
    pub fn residues(&self, index: usize) -> &[u64] {
        let degree = self.degree();
        &self.data.as_ref()[index * degree..(index + 1) * degree]
    }

    pub(super) fn residues_mut(&mut self, index: usize) -> &mut [u64] {
        let degree = self.degree();
        &mut self.data.as_mut()[index * degree..(index + 1) * degree]
    }

    pub fn residue(&self, index: usize, coeff: usize) -> u64 {
        self.residues(index)[coeff]
    }

    pub fn to_owned_poly(&self) -> Poly<F, Vec<u64>> {
        Poly {
            ctx: self.ctx.clone(),
            data: self.data.as_ref().to_vec(),
            _form: PhantomData,
        }
    }

    /// Copies the rows of `self` that belong to `ctx`, which must be a prefix
    /// of this polynomial's context. In evaluation form this is the same
    /// polynomial over fewer moduli since each row transforms independently.
    pub fn prefix(&self, ctx: &RingContext) -> RnsResult<Poly<F, Vec<u64>>> {
        if !self.ctx.has_prefix(ctx) {
            return Err(RnsError::ContextMismatch { operand: "prefix" });
        }
        Ok(Poly {
            ctx: ctx.clone(),
            data: self.data.as_ref()[..ctx.dims().words()].to_vec(),
            _form: PhantomData,
        })
    }

    /// Overwrites `self` with the residues of `other`.
    pub fn copy_from<T: Storage>(&mut self, other: &Poly<F, T>) -> RnsResult<()> {
        self.expect_same_context(other.context(), "source")?;
        self.data.as_mut().copy_from_slice(other.data());
        Ok(())
    }

    pub(super) fn expect_same_context(
        &self,
        other: &RingContext,
        operand: &'static str,
    ) -> RnsResult<()> {
        if &self.ctx != other {
            return Err(RnsError::ContextMismatch { operand });
        }
        Ok(())
    }

    /// Drops the trailing `q_last` row and moves to `next`.
    pub(super) fn shrink_to(&mut self, next: RingContext) {
        self.data.truncate_words(next.dims().words());
        self.ctx = next;
    }
}

// ─── Arithmetic ───────────────────────────────────────────────────────────────

impl<F: Form, S: Storage> Poly<F, S> {
    fn zip_rows<T: Storage>(
        &mut self,
        rhs: &Poly<F, T>,
        op: impl Fn(&Modulus, u64, u64) -> u64,
    ) -> RnsResult<()> {
        self.expect_same_context(rhs.context(), "rhs")?;
        let ctx = self.ctx.clone();
        for (index, modulus) in ctx.moduli().iter().enumerate() {
            for (a, &b) in self.residues_mut(index).iter_mut().zip(rhs.residues(index)) {
                *a = op(modulus, *a, b);
            }
        }
        Ok(())
    }

    /// Coefficient-wise addition. Valid in either form.
    pub fn add_assign<T: Storage>(&mut self, rhs: &Poly<F, T>) -> RnsResult<()> {
        self.zip_rows(rhs, Modulus::add)
    }

    pub fn sub_assign<T: Storage>(&mut self, rhs: &Poly<F, T>) -> RnsResult<()> {
        self.zip_rows(rhs, Modulus::sub)
    }

    pub fn neg_assign(&mut self) {
        let ctx = self.ctx.clone();
        for (index, modulus) in ctx.moduli().iter().enumerate() {
            for value in self.residues_mut(index) {
                *value = modulus.neg(*value);
            }
        }
    }

    /// Multiplies row `i` by `scalars[i]`, each reduced modulo `q_i`.
    pub fn mul_rns_scalar_assign(&mut self, scalars: &[ShoupModulus]) -> RnsResult<()> {
        if scalars.len() != self.ctx.nmoduli() {
            return Err(RnsError::ModulusCountMismatch {
                expected: self.ctx.nmoduli(),
                actual: scalars.len(),
            });
        }
        for (index, scalar) in scalars.iter().enumerate() {
            if scalar.modulus() != self.ctx.modulus(index).value() {
                return Err(RnsError::ContextMismatch { operand: "scalar" });
            }
            for value in self.residues_mut(index) {
                *value = scalar.multiply_reduce(*value);
            }
        }
        Ok(())
    }

    /// Multiplies every coefficient by the integer `scalar`.
    pub fn mul_scalar_assign(&mut self, scalar: u64) {
        let ctx = self.ctx.clone();
        for (index, modulus) in ctx.moduli().iter().enumerate() {
            let scalar = modulus.reduce(scalar);
            for value in self.residues_mut(index) {
                *value = modulus.mul(*value, scalar);
            }
        }
    }
}

impl<S: Storage> Poly<Eval, S> {
    /// Pointwise product, which is polynomial multiplication in `Z_Q[X] /
    /// (X^N + 1)`.
    pub fn mul_assign<T: Storage>(&mut self, rhs: &Poly<Eval, T>) -> RnsResult<()> {
        self.zip_rows(rhs, Modulus::mul)
    }
}

// ─── NTT collaborator ─────────────────────────────────────────────────────────

impl<S: Storage> Poly<Coeff, S> {
    /// In-place forward NTT of every row.
    pub fn forward_transform(mut self) -> RnsResult<Poly<Eval, S>> {
        let ctx = self.ctx.clone();
        for index in 0..ctx.nmoduli() {
            ctx.ntt_table(index)?.forward(self.residues_mut(index));
        }
        let (ctx, data) = self.into_parts();
        Ok(Poly::from_parts_unchecked(ctx, data))
    }

    /// `round(x / q_last)` over the next context of the chain.
    ///
    /// Adds `floor(q_last / 2)` to turn the floor of the exact division
    /// `(x - [x]_{q_last}) / q_last` into a rounding.
    pub fn divide_and_round_q_last(mut self) -> RnsResult<Poly<Coeff, S>> {
        let ctx = self.ctx.clone();
        let next = ctx.next().ok_or(RnsError::NoNextContext {
            nmoduli: ctx.nmoduli(),
        })?;
        let tables = ctx.rescale_tables()?;
        let last = ctx.nmoduli() - 1;
        let q_last = *ctx.q_last();

        for value in self.residues_mut(last) {
            *value = q_last.add(*value, tables.q_last_half);
        }
        let degree = ctx.degree();
        let (head, last_row) = self.data.as_mut().split_at_mut(last * degree);
        for (index, row) in head.chunks_exact_mut(degree).enumerate() {
            let modulus = ctx.modulus(index);
            let half = tables.q_last_half_mod_q[index];
            let inv_q_last = &tables.inv_q_last_mod_q[index];
            for (value, &x_last) in row.iter_mut().zip(last_row.iter()) {
                let shifted = modulus.sub(modulus.reduce(x_last), half);
                *value = inv_q_last.multiply_reduce(modulus.sub(*value, shifted));
            }
        }
        self.shrink_to(next);
        Ok(self)
    }
}

impl<S: Storage> Poly<Eval, S> {
    /// In-place inverse NTT of every row.
    pub fn inverse_transform(mut self) -> RnsResult<Poly<Coeff, S>> {
        let ctx = self.ctx.clone();
        for index in 0..ctx.nmoduli() {
            ctx.ntt_table(index)?.inverse(self.residues_mut(index));
        }
        let (ctx, data) = self.into_parts();
        Ok(Poly::from_parts_unchecked(ctx, data))
    }
}

impl<F: Form, S: Storage> PartialEq for Poly<F, S> {
    fn eq(&self, other: &Self) -> bool {
        self.ctx == other.ctx && self.data.as_ref() == other.data.as_ref()
    }
}

impl<F: Form, S: Storage> fmt::Debug for Poly<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poly")
            .field("form", &std::any::type_name::<F>())
            .field("ctx", &self.ctx)
            .field("data", &self.data.as_ref())
            .finish()
    }
}
