// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::id::BroadcastId;
use crate::subscription::Subscription;
use attune_core::Result;

/// Something values of type `T` can be published to and subscribed from.
///
/// Implemented by [`ColdBroadcast`](crate::ColdBroadcast) and
/// [`Mediator`](crate::Mediator); mediators accept any implementation as a source.
pub trait Broadcast<T>: Send + Sync {
    /// Identity shared by every clone of this broadcast.
    fn id(&self) -> BroadcastId;

    /// Opens a subscription seeded with the current value, counted as active.
    fn open_subscription(&self) -> Subscription<T>;

    /// Publishes `value` to every open subscription.
    ///
    /// # Errors
    ///
    /// [`AttuneError::ChannelClosed`](attune_core::AttuneError::ChannelClosed)
    /// when the broadcast has been closed.
    fn publish(&self, value: T) -> Result<()>;

    fn has_active_subscriptions(&self) -> bool;
}
