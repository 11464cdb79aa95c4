// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use attune_stream::{race, Race, RaceEvent, RaceOrder};
use futures::stream::{self, StreamExt};

#[tokio::test]
async fn alternate_order_interleaves_ready_inputs() {
    // Arrange
    let events = race(stream::iter(vec![1, 2]), stream::iter(vec![10, 20]));

    // Act
    let events: Vec<_> = events.collect().await;

    // Assert
    assert_eq!(
        events,
        vec![
            RaceEvent::Left(1),
            RaceEvent::Right(10),
            RaceEvent::Left(2),
            RaceEvent::Right(20),
            RaceEvent::LeftEnded,
            RaceEvent::RightEnded,
        ]
    );
}

#[tokio::test]
async fn right_first_drains_right_input_before_left() {
    // Arrange
    let events = Race::new(
        stream::iter(vec![1, 2]),
        stream::iter(vec![10, 20]),
        RaceOrder::RightFirst,
    );

    // Act
    let events: Vec<_> = events.collect().await;

    // Assert
    assert_eq!(
        events,
        vec![
            RaceEvent::Right(10),
            RaceEvent::Right(20),
            RaceEvent::RightEnded,
            RaceEvent::Left(1),
            RaceEvent::Left(2),
            RaceEvent::LeftEnded,
        ]
    );
}

#[tokio::test]
async fn each_end_is_reported_once() {
    // Arrange
    let mut events = race(stream::iter(vec![1]), stream::iter(Vec::<i32>::new()));

    // Act
    let first = events.next().await;
    let second = events.next().await;
    let third = events.next().await;
    let fourth = events.next().await;

    // Assert
    assert_eq!(first, Some(RaceEvent::Left(1)));
    assert_eq!(second, Some(RaceEvent::RightEnded));
    assert_eq!(third, Some(RaceEvent::LeftEnded));
    assert_eq!(fourth, None);
    assert!(events.is_left_done() && events.is_right_done());
}
