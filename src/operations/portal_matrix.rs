use crate::error::Result;
use crate::math::{invert, Matrix4};
use crate::scene::{PortalId, Scene};

/// Returns the matrix that carries points from `enter`'s side of the scene to
/// the side of the portal it is linked with.
///
/// Recomputed on every call, since either portal may have moved.
///
/// # Errors
///
/// Returns an error if either portal or an anchoring wall is missing.
///
/// # Panics
///
/// Panics if `enter` is not linked.
pub fn portal_matrix(scene: &Scene, enter: PortalId) -> Result<Matrix4> {
    let Some(exit) = scene.portal(enter)?.linked() else {
        panic!("portal must be linked to another portal");
    };
    portal_matrix_between(scene, enter, exit)
}

/// Returns the matrix from `enter`'s coordinate space to `exit`'s.
///
/// The exit transform is mirrored on X before building its matrix, so that
/// walking through the pair is continuous rather than reflected. The mirror
/// is applied to a copy and never stored.
///
/// # Errors
///
/// Returns an error if either portal or an anchoring wall is missing.
pub fn portal_matrix_between(scene: &Scene, enter: PortalId, exit: PortalId) -> Result<Matrix4> {
    let enter_matrix = scene.portal_world_transform(enter)?.matrix();
    let exit_matrix = scene.portal_world_transform(exit)?.mirrored().matrix();
    Ok(exit_matrix * invert(&enter_matrix))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{transform_point, Point2};
    use crate::scene::{PortalAnchor, PortalData};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn pair(scene: &mut Scene, rotation_b: f64) -> (PortalId, PortalId) {
        let a = scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::new(0.0, 0.0), 0.0)))
            .unwrap();
        let b = scene
            .add_portal(PortalData::new(PortalAnchor::free(
                Point2::new(10.0, 0.0),
                rotation_b,
            )))
            .unwrap();
        scene.link(a, b).unwrap();
        (a, b)
    }

    #[test]
    fn portal_centre_maps_to_linked_centre() {
        let mut scene = Scene::new();
        let (a, _) = pair(&mut scene, 0.3);
        let m = portal_matrix(&scene, a).unwrap();
        assert_relative_eq!(
            transform_point(&m, &Point2::origin()),
            Point2::new(10.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn front_of_entry_maps_behind_exit() {
        let mut scene = Scene::new();
        let (a, _) = pair(&mut scene, 0.0);
        let m = portal_matrix(&scene, a).unwrap();
        // One unit in front of A comes out one unit behind B (mirrored X).
        let p = transform_point(&m, &Point2::new(1.0, 0.25));
        assert_relative_eq!(p, Point2::new(9.0, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn rotated_exit() {
        let mut scene = Scene::new();
        let (a, _) = pair(&mut scene, FRAC_PI_2);
        let m = portal_matrix(&scene, a).unwrap();
        let p = transform_point(&m, &Point2::new(-1.0, 0.0));
        assert_relative_eq!(p, Point2::new(10.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn matrices_of_a_pair_are_inverse() {
        let mut scene = Scene::new();
        let (a, b) = pair(&mut scene, 1.1);
        let product = portal_matrix(&scene, b).unwrap() * portal_matrix(&scene, a).unwrap();
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "must be linked")]
    fn unlinked_portal_panics() {
        let mut scene = Scene::new();
        let a = scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::origin(), 0.0)))
            .unwrap();
        let _ = portal_matrix(&scene, a);
    }
}
