use pixel_windows::core::{AlphaHandling, Framebuffer};
use pixel_windows::Rgba;

// ============================================================================
// Write semantics
// ============================================================================

#[test]
fn test_set_pixel_is_opaque() {
    let mut fb = Framebuffer::transparent(4, 4);
    fb.set_pixel(2, 3, 9, 8, 7);
    assert_eq!(fb.pixel(2, 3), Some(Rgba::new(9, 8, 7, 255)));
}

#[test]
fn test_set_pixel_rgba_last_write_wins() {
    let mut fb = Framebuffer::new(2, 2);
    fb.set_pixel_rgba(1, 1, 200, 200, 200, 100);
    fb.set_pixel_rgba(1, 1, 10, 20, 30, 0);
    assert_eq!(fb.pixel(1, 1), Some(Rgba::new(10, 20, 30, 0)));
}

#[test]
fn test_out_of_bounds_is_noop_everywhere() {
    let mut fb = Framebuffer::new(5, 4);
    let before = fb.clone();

    let outside = [(-1, 0), (0, -1), (5, 0), (0, 4), (5, 4), (-100, -100), (i32::MAX, 0)];
    for (x, y) in outside {
        fb.set_pixel(x, y, 255, 0, 0);
        fb.set_pixel_rgba(x, y, 0, 255, 0, 0);
        fb.write(x, y, Rgba::new(1, 1, 1, 1));
        assert_eq!(fb.pixel(x, y), None);
    }
    assert_eq!(fb, before);
}

#[test]
fn test_clear_and_fill_agree() {
    let mut cleared = Framebuffer::new(3, 3);
    let mut filled = Framebuffer::transparent(3, 3);
    cleared.clear(40, 50, 60);
    filled.fill(40, 50, 60);
    assert_eq!(cleared, filled);

    cleared.clear_black();
    assert_eq!(cleared, Framebuffer::new(3, 3));
}

#[test]
fn test_clear_rgba_keeps_alpha() {
    let mut fb = Framebuffer::new(2, 1);
    fb.clear_rgba(Rgba::new(1, 2, 3, 4));
    assert!(fb.pixels().chunks(4).all(|px| px == [1, 2, 3, 4]));
}

#[test]
fn test_zero_sized_buffer() {
    let mut fb = Framebuffer::new(0, 7);
    fb.set_pixel(0, 0, 1, 1, 1);
    fb.clear(1, 1, 1);
    assert!(fb.is_empty());
    assert_eq!(fb.pixel_count(), 0);
    assert_eq!(fb.dimensions(), (0, 7));
}

// ============================================================================
// Presentation
// ============================================================================

#[test]
fn test_compose_modes() {
    let mut fb = Framebuffer::transparent(2, 1);
    fb.set_pixel_rgba(0, 0, 255, 255, 255, 0);
    fb.set_pixel_rgba(1, 0, 200, 100, 50, 255);

    assert_eq!(
        fb.compose(AlphaHandling::Straight),
        vec![255, 255, 255, 0, 200, 100, 50, 255]
    );
    assert_eq!(
        fb.compose(AlphaHandling::Opaque),
        vec![255, 255, 255, 255, 200, 100, 50, 255]
    );
    assert_eq!(
        fb.compose(AlphaHandling::Premultiplied),
        vec![0, 0, 0, 0, 200, 100, 50, 255]
    );
}

#[test]
fn test_compose_does_not_mutate_buffer() {
    let mut fb = Framebuffer::new(1, 1);
    fb.set_pixel_rgba(0, 0, 10, 20, 30, 0);
    let _ = fb.compose(AlphaHandling::Opaque);
    assert_eq!(fb.pixel(0, 0), Some(Rgba::new(10, 20, 30, 0)));
}

#[test]
fn test_fitted_for_clamped_surface() {
    let fb = Framebuffer::new(0, 0);
    let fitted = fb.fitted(1, 1, Rgba::TRANSPARENT);
    assert_eq!(fitted.dimensions(), (1, 1));
    assert_eq!(fitted.pixel(0, 0), Some(Rgba::TRANSPARENT));
}
