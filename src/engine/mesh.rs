use std::f32::consts::PI;

/// Largest accepted rows/cols count. Keeps every vertex index well inside `u32`.
pub const MAX_RESOLUTION: u32 = 4096;

/// Unit sphere geometry as parallel attribute buffers. Vertex `i` is
/// described by `positions[i]`, `normals[i]` and `tex_coords[i]`.
#[derive(Clone, Debug)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

// Rows walk the polar angle from +Y to -Y, columns walk a full revolution.
// The last column lands back on the first one so the texture can run to u = 1
// without leaving a gap in the surface.
pub fn generate_sphere(rows: u32, cols: u32) -> SphereMesh {
    assert!(rows >= 2 && cols >= 2, "sphere needs at least 2 rows and 2 columns");
    assert_eq!(rows, cols, "sphere tessellation must be square");
    assert!(
        rows <= MAX_RESOLUTION,
        "sphere resolution {rows} exceeds the maximum of {MAX_RESOLUTION}"
    );

    let vertex_count = rows as usize * cols as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);
    let mut tex_coords = Vec::with_capacity(vertex_count);

    for i in 0..rows {
        let v = i as f32 / (rows - 1) as f32;
        let theta = PI * v;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for j in 0..cols {
            let u = j as f32 / (cols - 1) as f32;
            let phi = 2.0 * PI * u;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let position = [sin_theta * sin_phi, cos_theta, sin_theta * cos_phi];
            positions.push(position);
            // Unit sphere: the outward normal is the position itself
            normals.push(position);
            tex_coords.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity(6 * (rows as usize - 1) * (cols as usize - 1));
    for i in 0..(rows - 1) {
        for j in 0..(cols - 1) {
            let top_left = i * cols + j;
            let top_right = top_left + 1;
            let bottom_left = top_left + cols;
            let bottom_right = bottom_left + 1;

            // Counter-clockwise when seen from outside
            indices.push(top_left);
            indices.push(bottom_left);
            indices.push(bottom_right);

            indices.push(top_left);
            indices.push(bottom_right);
            indices.push(top_right);
        }
    }

    SphereMesh {
        positions,
        normals,
        tex_coords,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn counts_match_resolution() {
        for n in 2..=12 {
            let mesh = generate_sphere(n, n);
            let n = n as usize;
            assert_eq!(mesh.vertex_count(), n * n);
            assert_eq!(mesh.normals.len(), n * n);
            assert_eq!(mesh.tex_coords.len(), n * n);
            assert_eq!(mesh.indices.len(), 6 * (n - 1) * (n - 1));
            assert_eq!(mesh.triangle_count(), 2 * (n - 1) * (n - 1));
        }
    }

    #[test]
    fn indices_are_in_range() {
        let mesh = generate_sphere(17, 17);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn resolution_four_matches_reference_counts() {
        let mesh = generate_sphere(4, 4);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.indices.len(), 54);
    }

    #[test]
    fn positions_lie_on_unit_sphere() {
        let mesh = generate_sphere(33, 33);
        for p in &mesh.positions {
            assert!((length(*p) - 1.0).abs() < 1e-5, "{p:?}");
        }
    }

    #[test]
    fn normals_are_unit_and_outward() {
        let mesh = generate_sphere(9, 9);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((length(*n) - 1.0).abs() < 1e-5);
            assert!(dot(*p, *n) > 0.99);
        }
    }

    #[test]
    fn first_and_last_rows_are_poles() {
        let n = 6;
        let mesh = generate_sphere(n, n);
        for j in 0..n as usize {
            assert!((mesh.positions[j][1] - 1.0).abs() < 1e-6);
            let last = (n as usize - 1) * n as usize + j;
            assert!((mesh.positions[last][1] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn seam_column_duplicates_first_column() {
        let n = 8u32;
        let mesh = generate_sphere(n, n);
        for i in 0..n {
            let first = (i * n) as usize;
            let last = (i * n + n - 1) as usize;
            assert!(length(sub(mesh.positions[first], mesh.positions[last])) < 1e-5);
            assert_eq!(mesh.tex_coords[first][0], 0.0);
            assert_eq!(mesh.tex_coords[last][0], 1.0);
            assert_eq!(mesh.tex_coords[first][1], mesh.tex_coords[last][1]);
        }
    }

    #[test]
    fn tex_coords_span_unit_square_monotonically() {
        let n = 5u32;
        let mesh = generate_sphere(n, n);
        for i in 0..n {
            for j in 1..n {
                let prev = mesh.tex_coords[(i * n + j - 1) as usize];
                let cur = mesh.tex_coords[(i * n + j) as usize];
                assert!(cur[0] > prev[0]);
            }
        }
        assert_eq!(mesh.tex_coords[0], [0.0, 0.0]);
        assert_eq!(mesh.tex_coords[(n * n - 1) as usize], [1.0, 1.0]);
    }

    #[test]
    fn triangles_wind_outward() {
        let mesh = generate_sphere(12, 12);
        for tri in mesh.indices.chunks(3) {
            let a = mesh.positions[tri[0] as usize];
            let b = mesh.positions[tri[1] as usize];
            let c = mesh.positions[tri[2] as usize];
            let n = cross(sub(b, a), sub(c, a));
            // Pole cells produce one degenerate triangle each
            if length(n) < 1e-6 {
                continue;
            }
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            assert!(dot(n, centroid) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    #[should_panic(expected = "square")]
    fn rejects_non_square_tessellation() {
        generate_sphere(4, 5);
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn rejects_degenerate_resolution() {
        generate_sphere(1, 1);
    }

    #[test]
    #[should_panic(expected = "exceeds the maximum")]
    fn rejects_oversized_resolution() {
        generate_sphere(70_000, 70_000);
    }

    #[test]
    fn largest_resolution_indices_fit() {
        let n = MAX_RESOLUTION;
        // Last vertex of the last cell, computed the way the generator does
        let last = (n - 2) * n + (n - 2) + n + 1;
        assert_eq!(last as usize, n as usize * n as usize - 1);
    }
}
