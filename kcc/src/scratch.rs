//! Scoped reassignment of collider layers.
//!
//! Queries that must ignore specific colliders (the controller's own body) or must target
//! exactly one collider (the pushback direction test) move those colliders onto a reserved
//! scratch layer for the duration of the query. [`ScratchLayer`] owns that reassignment: it
//! records each collider's original layer when acquired and restores all of them, in reverse
//! order, when dropped. Restoration therefore also happens on early returns and `?`.
//!
//! Guards borrow the world mutably, so two scratch reassignments can only nest explicitly
//! (an inner guard acquired through an outer one), never overlap.

use std::ops::{Deref, DerefMut};

use crate::{
    layers::Layer,
    types::ColliderId,
    world::PhysicsWorld,
};

pub struct ScratchLayer<'w, W: PhysicsWorld + ?Sized> {
    world: &'w mut W,
    saved: Vec<(ColliderId, Layer)>,
}

impl<'w, W: PhysicsWorld + ?Sized> ScratchLayer<'w, W> {
    /// Move every collider in `colliders` onto `scratch`, remembering its original layer.
    ///
    /// Colliders unknown to the world are skipped.
    pub fn acquire(
        world: &'w mut W,
        scratch: Layer,
        colliders: impl IntoIterator<Item = ColliderId>,
    ) -> Self {
        let mut saved = Vec::new();
        for collider in colliders {
            if let Some(original) = world.layer(collider) {
                saved.push((collider, original));
                world.set_layer(collider, scratch);
            }
        }
        Self { world, saved }
    }

    /// Colliders currently held on the scratch layer.
    pub fn held(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.saved.iter().map(|(id, _)| *id)
    }
}

impl<W: PhysicsWorld + ?Sized> Deref for ScratchLayer<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.world
    }
}

impl<W: PhysicsWorld + ?Sized> DerefMut for ScratchLayer<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.world
    }
}

impl<W: PhysicsWorld + ?Sized> Drop for ScratchLayer<'_, W> {
    fn drop(&mut self) {
        for (collider, original) in self.saved.drain(..).rev() {
            self.world.set_layer(collider, original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_world::{ColliderDef, ColliderShapeDef, QueryWorld};
    use crate::types::Vec3;

    fn ball_at(x: f32, layer: Layer) -> ColliderDef {
        ColliderDef::new(ColliderShapeDef::Sphere { radius: 0.5 })
            .with_translation(Vec3::new(x, 0.0, 0.0))
            .with_layer(layer)
    }

    #[test]
    fn restores_layers_on_drop() {
        let mut world = QueryWorld::new();
        let a = world.insert(ball_at(0.0, Layer(2)));
        let b = world.insert(ball_at(3.0, Layer(5)));

        {
            let guard = ScratchLayer::acquire(&mut world, Layer(31), [a, b]);
            assert_eq!(guard.layer(a), Some(Layer(31)));
            assert_eq!(guard.layer(b), Some(Layer(31)));
            assert_eq!(guard.held().count(), 2);
        }

        assert_eq!(world.layer(a), Some(Layer(2)));
        assert_eq!(world.layer(b), Some(Layer(5)));
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let mut world = QueryWorld::new();
        let a = world.insert(ball_at(0.0, Layer(1)));

        {
            let mut outer = ScratchLayer::acquire(&mut world, Layer(30), [a]);
            {
                let inner = ScratchLayer::acquire(&mut *outer, Layer(31), [a]);
                assert_eq!(inner.layer(a), Some(Layer(31)));
            }
            // Inner restores to what the outer guard had set.
            assert_eq!(outer.layer(a), Some(Layer(30)));
        }

        assert_eq!(world.layer(a), Some(Layer(1)));
    }

    #[test]
    fn restores_on_early_return() {
        fn probe(world: &mut QueryWorld, id: ColliderId) -> Result<(), ()> {
            let _guard = ScratchLayer::acquire(world, Layer(31), [id]);
            Err(())?;
            Ok(())
        }

        let mut world = QueryWorld::new();
        let a = world.insert(ball_at(0.0, Layer(4)));
        assert!(probe(&mut world, a).is_err());
        assert_eq!(world.layer(a), Some(Layer(4)));
    }

    #[test]
    fn unknown_colliders_are_skipped() {
        let mut world = QueryWorld::new();
        let guard = ScratchLayer::acquire(&mut world, Layer(31), [ColliderId(99)]);
        assert_eq!(guard.held().count(), 0);
    }
}
