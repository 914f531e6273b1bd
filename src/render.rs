use std::sync::atomic::{AtomicBool, Ordering};

use tiny_skia as sk;

use crate::dna::{Genome, Polygon};
use crate::raster::Raster;

// hard edges by default so renders are reproducible pixel for pixel
static POLYGON_ANTIALIASING: AtomicBool = AtomicBool::new(false);

/// toggle anti-aliased polygon edges for every subsequent render
pub fn set_polygon_antialiasing(enabled: bool) {
    POLYGON_ANTIALIASING.store(enabled, Ordering::Relaxed);
}

/// Composite the genome back-to-front onto opaque white and return an RGB raster.
///
/// Each polygon is filled with source-over blending of its straight RGBA color,
/// which is the same as painting it on a transparent layer and compositing that
/// layer onto the canvas. Degenerate polygons (fewer than two distinct points)
/// contribute nothing.
pub fn render_genome(genome: &Genome) -> Raster {
    profiling::scope!("render_genome");
    let (w, h) = (genome.width, genome.height);

    let Some(mut pix) = sk::Pixmap::new(w, h) else {
        // zero-sized canvas
        return Raster::filled(w, h, &[255, 255, 255]);
    };
    pix.fill(sk::Color::WHITE);

    let anti_alias = POLYGON_ANTIALIASING.load(Ordering::Relaxed);
    for poly in &genome.polygons {
        draw_polygon(&mut pix, poly, anti_alias);
    }

    // the background is opaque so premultiplied bytes equal straight ones
    let data: Vec<u8> = pix
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    Raster::new(w, h, 3, data).unwrap_or_else(|_| Raster::filled(w, h, &[255, 255, 255]))
}

fn draw_polygon(pix: &mut sk::Pixmap, poly: &Polygon, anti_alias: bool) {
    profiling::scope!("draw_polygon");
    let Some(&(x0, y0)) = poly.vertices.first() else {
        return;
    };
    if poly.color[3] == 0 {
        return;
    }

    let mut pb = sk::PathBuilder::new();
    pb.move_to(x0 as f32, y0 as f32);
    for &(x, y) in &poly.vertices[1..] {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    // finish() refuses paths with empty bounds (all points collinear on an axis)
    let Some(path) = pb.finish() else {
        return;
    };

    let [r, g, b, a] = poly.color;
    let mut paint = sk::Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = anti_alias;

    pix.fill_path(&path, &paint, sk::FillRule::EvenOdd, sk::Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_genome_is_white() {
        let img = render_genome(&Genome::new_blank(4, 3));
        assert_eq!(img.channels(), 3);
        assert!(img.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_opaque_square_covers_canvas() {
        let mut g = Genome::new_blank(8, 8);
        g.polygons.push(Polygon {
            vertices: vec![(0, 0), (8, 0), (8, 8), (0, 8)],
            color: [10, 20, 30, 255],
        });
        let img = render_genome(&g);
        assert_eq!(img.rgb_at(0, 0), [10, 20, 30]);
        assert_eq!(img.rgb_at(7, 7), [10, 20, 30]);
    }

    #[test]
    fn test_later_polygons_paint_over() {
        let mut g = Genome::new_blank(4, 4);
        let square = vec![(0, 0), (4, 0), (4, 4), (0, 4)];
        g.polygons.push(Polygon { vertices: square.clone(), color: [255, 0, 0, 255] });
        g.polygons.push(Polygon { vertices: square, color: [0, 0, 255, 255] });
        assert_eq!(render_genome(&g).rgb_at(2, 2), [0, 0, 255]);
    }

    #[test]
    fn test_half_alpha_blends_with_white() {
        let mut g = Genome::new_blank(4, 4);
        g.polygons.push(Polygon {
            vertices: vec![(0, 0), (4, 0), (4, 4), (0, 4)],
            color: [0, 0, 0, 128],
        });
        let px = render_genome(&g).rgb_at(1, 1);
        for c in px {
            assert!((120..=135).contains(&c), "channel {c} not near mid grey");
        }
    }
}
