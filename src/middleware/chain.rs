use super::Middleware;
use crate::{Request, ResponseBuilder, RouterError};
use std::sync::Arc;

/// An ordered group of handlers executed as one logical unit.
///
/// A chain is either a single handler ([`Chain::Atomic`]) or a flattened,
/// non-empty list of handlers ([`Chain::Composite`]).  Composites are never
/// nested: [`Chain::merge`] flattens its inputs all the way down to atomic
/// leaves before wrapping them, and a merge that yields exactly one leaf
/// returns it unwrapped, so the handler keeps its identity for
/// introspection.
///
/// A composite runs its leaves in order, with the same short-circuit
/// contract as the route scan itself: once a leaf submits the response (or
/// upgrades the request), the remaining leaves do not run.  A leaf that has
/// to wait on something suspends the whole chain at that point; execution
/// resumes at the next leaf, never earlier.
#[derive(Clone)]
pub enum Chain {
    /// A single handler.
    Atomic(Arc<dyn Middleware>),
    /// A flattened, non-empty leaf list.
    Composite(Arc<[Arc<dyn Middleware>]>),
}

impl Chain {
    /// Merges any number of chains into one.
    ///
    /// All inputs are unmerged first, producing one flat ordered leaf list.
    /// A single resulting leaf is returned as [`Chain::Atomic`]; anything
    /// more becomes a [`Chain::Composite`] over the flattened list.
    ///
    /// # Errors
    /// Returns [`RouterError::InvalidRegistration`] if the inputs contain no
    /// handlers at all.
    ///
    /// # Examples
    /// ```rust
    /// use shunt::{middleware, Chain, IntoChain};
    ///
    /// let a = middleware::sync(|_req, res| {
    ///     res.send("a");
    ///     Ok(())
    /// })
    /// .into_chain();
    /// let b = middleware::sync(|_req, _res| Ok(())).into_chain();
    /// let merged = Chain::merge([a, b]).unwrap();
    /// assert_eq!(merged.leaves().len(), 2);
    /// ```
    pub fn merge<I: IntoIterator<Item = Chain>>(chains: I) -> Result<Chain, RouterError> {
        let mut leaves = Chain::unmerge(chains);
        match leaves.len() {
            0 => Err(RouterError::InvalidRegistration),
            1 => Ok(Chain::Atomic(leaves.remove(0))),
            _ => Ok(Chain::Composite(leaves.into())),
        }
    }

    /// Unmerges any number of chains into their flat, ordered leaf list.
    ///
    /// This is the inverse of [`Chain::merge`]: composites are replaced by
    /// their leaves, order is preserved, and the handlers themselves are
    /// shared, not copied.
    pub fn unmerge<I: IntoIterator<Item = Chain>>(chains: I) -> Vec<Arc<dyn Middleware>> {
        let mut leaves = Vec::new();
        for chain in chains {
            match chain {
                Chain::Atomic(leaf) => leaves.push(leaf),
                Chain::Composite(inner) => leaves.extend(inner.iter().cloned()),
            }
        }
        leaves
    }

    /// Splices one chain in front of another.  Used by the route table when
    /// fusing a registration into the preceding route; infallible, since both
    /// sides already carry at least one handler.
    pub(crate) fn concat(front: Chain, back: Chain) -> Chain {
        let leaves = Chain::unmerge([front, back]);
        if leaves.len() == 1 {
            let mut leaves = leaves;
            Chain::Atomic(leaves.remove(0))
        } else {
            Chain::Composite(leaves.into())
        }
    }

    /// The ordered leaf list of this chain.  An atomic chain has exactly one
    /// leaf; a composite exposes its full flattened list.
    pub fn leaves(&self) -> &[Arc<dyn Middleware>] {
        match self {
            Chain::Atomic(leaf) => std::slice::from_ref(leaf),
            Chain::Composite(leaves) => leaves,
        }
    }

    /// The number of handlers in this chain.
    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    /// Whether the chain is empty.  It never is; this exists for symmetry
    /// with [`Chain::len`].
    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }

    /// Runs the chain against the given request and response builder.
    ///
    /// A composite stops early as soon as a leaf submits the response or
    /// upgrades the request; the enclosing route scan applies the same check
    /// after the chain as a whole returns.
    pub async fn call(
        &self,
        request: &mut Request,
        response: &mut ResponseBuilder,
    ) -> Result<(), anyhow::Error> {
        match self {
            Chain::Atomic(leaf) => leaf.call(request, response).await,
            Chain::Composite(leaves) => {
                for leaf in leaves.iter() {
                    leaf.call(request, response).await?;
                    if response.submitted() || request.is_upgraded() {
                        break;
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Atomic(leaf) => f.debug_tuple("Atomic").field(leaf).finish(),
            Chain::Composite(leaves) => f.debug_tuple("Composite").field(leaves).finish(),
        }
    }
}

/// Conversion of handlers, handler tuples, and chains into a [`Chain`].
///
/// This is what lets the registration methods accept one handler, a tuple of
/// handlers, or a prebuilt chain for the same parameter.  Tuples preserve
/// order, and mixed nesting flattens: registering `(a, (b, c))` produces the
/// same chain as registering `(a, b, c)`.
pub trait IntoChain {
    /// Converts the value into a chain.
    fn into_chain(self) -> Chain;
}

impl<M: Middleware> IntoChain for M {
    fn into_chain(self) -> Chain {
        Chain::Atomic(Arc::new(self))
    }
}

impl IntoChain for Chain {
    fn into_chain(self) -> Chain {
        self
    }
}

macro_rules! into_chain_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoChain),+> IntoChain for ($($name,)+) {
            fn into_chain(self) -> Chain {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                let mut acc: Option<Chain> = None;
                $(
                    let next = $name.into_chain();
                    acc = Some(match acc {
                        Some(front) => Chain::concat(front, next),
                        None => next,
                    });
                )+
                acc.expect("tuples always carry at least one handler")
            }
        }
    };
}

into_chain_tuple!(A);
into_chain_tuple!(A, B);
into_chain_tuple!(A, B, C);
into_chain_tuple!(A, B, C, D);
into_chain_tuple!(A, B, C, D, E);
