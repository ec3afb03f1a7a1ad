use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};

enum Side {
    Left,
    Right,
}

/// Mirrors whichever of two streams produces something first (an item or its
/// end) and drops the other.
///
/// When both are ready on the same poll the left stream wins.
pub(crate) struct Amb<A, B> {
    left: Option<A>,
    right: Option<B>,
}

impl<A, B> Amb<A, B> {
    pub(crate) fn new(left: A, right: B) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }
}

impl<T, A, B> Stream for Amb<A, B>
where
    A: Stream<Item = T> + Unpin,
    B: Stream<Item = T> + Unpin,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        let (side, item) = match (this.left.as_mut(), this.right.as_mut()) {
            (Some(left), Some(right)) => {
                if let Poll::Ready(item) = left.poll_next_unpin(cx) {
                    (Side::Left, item)
                } else if let Poll::Ready(item) = right.poll_next_unpin(cx) {
                    (Side::Right, item)
                } else {
                    return Poll::Pending;
                }
            }
            (Some(left), None) => return left.poll_next_unpin(cx),
            (None, Some(right)) => return right.poll_next_unpin(cx),
            (None, None) => return Poll::Ready(None),
        };
        match side {
            Side::Left => this.right = None,
            Side::Right => this.left = None,
        }
        Poll::Ready(item)
    }
}
