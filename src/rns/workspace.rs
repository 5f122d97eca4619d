use super::{
    context::RingContext,
    errors::{RnsError, RnsResult},
    poly::{Form, Poly},
};

/// A word arena sized up front by the `*_scratch_words` functions.
///
/// Allocation happens through [`Scratch`] scopes that borrow the arena, so
/// every slice handed out is returned when its scope is dropped, whether the
/// enclosing routine succeeds or fails.
#[derive(Debug, Default)]
pub struct Workspace {
    words: Vec<u64>,
}

impl Workspace {
    pub fn with_capacity(words: usize) -> Self {
        Self {
            words: vec![0; words],
        }
    }

    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Opens the outermost allocation scope.
    pub fn scratch(&mut self) -> Scratch<'_> {
        Scratch {
            free: &mut self.words,
        }
    }
}

/// A bump allocator over the unused tail of a [`Workspace`].
#[derive(Debug)]
pub struct Scratch<'a> {
    free: &'a mut [u64],
}

impl<'a> Scratch<'a> {
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Hands out `words` zeroed words that live as long as this scope.
    pub fn alloc(&mut self, words: usize) -> RnsResult<&'a mut [u64]> {
        let available = self.free.len();
        if words > available {
            return Err(RnsError::WorkspaceExhausted {
                requested: words,
                available,
            });
        }
        let free = std::mem::take(&mut self.free);
        let (head, tail) = free.split_at_mut(words);
        self.free = tail;
        head.fill(0);
        Ok(head)
    }

    /// Allocates a zero polynomial over `ctx`.
    pub fn alloc_poly<F: Form>(&mut self, ctx: &RingContext) -> RnsResult<Poly<F, &'a mut [u64]>> {
        let words = self.alloc(ctx.dims().words())?;
        Poly::zeroed_in(ctx, words)
    }

    /// Opens a nested scope. Everything it allocates is released when it is
    /// dropped; allocations made earlier in `self` stay valid.
    pub fn scope(&mut self) -> Scratch<'_> {
        Scratch {
            free: &mut *self.free,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rns::poly::Coeff;

    #[test]
    fn alloc_splits_and_reports_exhaustion() {
        let mut workspace = Workspace::with_capacity(10);
        let mut scratch = workspace.scratch();
        let first = scratch.alloc(4).unwrap();
        first.fill(1);
        assert_eq!(scratch.available(), 6);
        assert!(matches!(
            scratch.alloc(7),
            Err(RnsError::WorkspaceExhausted {
                requested: 7,
                available: 6
            })
        ));
        let second = scratch.alloc(6).unwrap();
        assert!(second.iter().all(|&w| w == 0));
        assert_eq!(first, &[1, 1, 1, 1]);
    }

    #[test]
    fn nested_scope_releases_on_drop() {
        let mut workspace = Workspace::with_capacity(8);
        let mut scratch = workspace.scratch();
        let outer = scratch.alloc(2).unwrap();
        {
            let mut inner = scratch.scope();
            inner.alloc(6).unwrap();
            assert_eq!(inner.available(), 0);
        }
        assert_eq!(scratch.available(), 6);
        outer[0] = 5;
        assert_eq!(outer[0], 5);
    }

    #[test]
    fn failed_inner_work_leaves_outer_capacity() {
        fn fails(scratch: &mut Scratch<'_>) -> RnsResult<()> {
            let mut scope = scratch.scope();
            scope.alloc(3)?;
            scope.alloc(100)?;
            Ok(())
        }
        let mut workspace = Workspace::with_capacity(5);
        let mut scratch = workspace.scratch();
        assert!(fails(&mut scratch).is_err());
        assert_eq!(scratch.available(), 5);
    }

    #[test]
    fn alloc_poly_matches_context_shape() {
        let ctx = RingContext::new(4, &[17, 29]).unwrap();
        let mut workspace = Workspace::with_capacity(8);
        let mut scratch = workspace.scratch();
        let poly = scratch.alloc_poly::<Coeff>(&ctx).unwrap();
        assert_eq!(poly.data().len(), 8);
        assert!(scratch.alloc_poly::<Coeff>(&ctx).is_err());
    }
}
