//! Coverage masks.
//!
//! Every primitive is rasterized into a [`Mask`] in the layer's local,
//! untransformed space. The render context then composites the mask through
//! the current transform, so rotation is handled once for all layer types.

use common::geometry::{Outline, Point, Polygon, Rect};

/// Per-pixel coverage in `[0, 1]` over an integer-aligned region.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Mask {
    pub fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Zeroed mask covering the pixels `rect` touches.
    pub fn covering(rect: Rect) -> Self {
        let r = rect.round_out();
        Self::new(
            r.x as i32,
            r.y as i32,
            r.width.max(0.0) as usize,
            r.height.max(0.0) as usize,
        )
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage of the pixel at absolute integer coordinates.
    pub fn coverage_at(&self, x: i32, y: i32) -> f32 {
        self.at(x as i64 - self.x as i64, y as i64 - self.y as i64)
    }

    #[inline]
    fn at(&self, col: i64, row: i64) -> f32 {
        if col < 0 || row < 0 || col >= self.width as i64 || row >= self.height as i64 {
            return 0.0;
        }
        self.data[row as usize * self.width + col as usize]
    }

    /// Bilinear sample at a point. Pixel centers sample exactly.
    pub fn sample(&self, p: Point) -> f32 {
        let fx = p.x - self.x as f32 - 0.5;
        let fy = p.y - self.y as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (c, r) = (x0 as i64, y0 as i64);

        let top = self.at(c, r) * (1.0 - tx) + self.at(c + 1, r) * tx;
        let bottom = self.at(c, r + 1) * (1.0 - tx) + self.at(c + 1, r + 1) * tx;
        (top * (1.0 - ty) + bottom * ty).clamp(0.0, 1.0)
    }

    /// Sum of all coverage values.
    pub fn total(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Nonzero-winding fill with `samples`×`samples` supersampling.
    pub fn fill_outline(outline: &Outline, samples: u32, clip: Rect) -> Mask {
        let Some(region) = outline.bounds().intersection(&clip) else {
            return Mask::empty();
        };
        let mut mask = Mask::covering(region);
        if mask.is_empty() {
            return mask;
        }

        let n = samples.clamp(1, 4) as usize;
        let step = 1.0 / n as f32;
        let weight = step * step;
        let total_cols = (mask.width * n) as f32;

        let edges: Vec<(Point, Point)> = outline.polygons.iter().flat_map(closed_edges).collect();
        let mut crossings: Vec<(f32, i32)> = Vec::with_capacity(edges.len());

        for row in 0..mask.height {
            for sy in 0..n {
                let y = mask.y as f32 + row as f32 + (sy as f32 + 0.5) * step;

                crossings.clear();
                for &(a, b) in &edges {
                    let dir = if a.y <= y && b.y > y {
                        1
                    } else if b.y <= y && a.y > y {
                        -1
                    } else {
                        continue;
                    };
                    let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                    crossings.push((x, dir));
                }
                crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

                let mut winding = 0;
                for pair in crossings.windows(2) {
                    winding += pair[0].1;
                    if winding == 0 {
                        continue;
                    }
                    // Sample k sits at mask.x + (k + 0.5) / n.
                    let start = (pair[0].0 - mask.x as f32) * n as f32 - 0.5;
                    let end = (pair[1].0 - mask.x as f32) * n as f32 - 0.5;
                    let first = start.ceil().max(0.0) as usize;
                    let last = end.ceil().min(total_cols).max(0.0) as usize;
                    for k in first..last {
                        mask.data[row * mask.width + k / n] += weight;
                    }
                }
            }
        }

        mask
    }

    /// Stroke centered on the outline with butt-ended dashes and round joins.
    ///
    /// An empty `dash` draws a solid line.
    pub fn stroke_outline(
        outline: &Outline,
        width: f32,
        dash: &[f32],
        samples: u32,
        clip: Rect,
    ) -> Mask {
        let half = width / 2.0;
        if !(half > 0.0) {
            return Mask::empty();
        }
        let Some(region) = outline
            .bounds()
            .inflate(half + 1.0, half + 1.0)
            .intersection(&clip)
        else {
            return Mask::empty();
        };
        let mut mask = Mask::covering(region);
        if mask.is_empty() {
            return mask;
        }

        let n = samples.clamp(1, 4) as usize;
        let step = 1.0 / n as f32;
        let full: u16 = ((1u32 << (n * n)) - 1) as u16;
        let pattern = DashPattern::new(dash);
        let mut bits = vec![0u16; mask.width * mask.height];
        let mask_bounds = mask.bounds();

        for polygon in &outline.polygons {
            for (a, b, arc_start) in polygon.segments() {
                let reach = Rect::new(
                    a.x.min(b.x),
                    a.y.min(b.y),
                    (a.x - b.x).abs(),
                    (a.y - b.y).abs(),
                )
                .inflate(half, half);
                let Some(reach) = reach.intersection(&mask_bounds) else {
                    continue;
                };
                let reach = reach.round_out();
                let c0 = (reach.x as i32 - mask.x).max(0) as usize;
                let r0 = (reach.y as i32 - mask.y).max(0) as usize;
                let c1 = ((reach.right() as i32 - mask.x).max(0) as usize).min(mask.width);
                let r1 = ((reach.bottom() as i32 - mask.y).max(0) as usize).min(mask.height);

                let ab = b - a;
                let len_sq = ab.x * ab.x + ab.y * ab.y;
                let len = len_sq.sqrt();

                for row in r0..r1 {
                    for col in c0..c1 {
                        let idx = row * mask.width + col;
                        if bits[idx] == full {
                            continue;
                        }
                        for sy in 0..n {
                            for sx in 0..n {
                                let p = Point::new(
                                    mask.x as f32 + col as f32 + (sx as f32 + 0.5) * step,
                                    mask.y as f32 + row as f32 + (sy as f32 + 0.5) * step,
                                );
                                let t = if len_sq > 0.0 {
                                    (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len_sq)
                                        .clamp(0.0, 1.0)
                                } else {
                                    0.0
                                };
                                let on = pattern
                                    .as_ref()
                                    .map_or(true, |d| d.is_on(arc_start + t * len));
                                if on && p.distance(a.lerp(b, t)) <= half {
                                    bits[idx] |= 1 << (sy * n + sx);
                                }
                            }
                        }
                    }
                }
            }
        }

        let weight = step * step;
        for (value, b) in mask.data.iter_mut().zip(&bits) {
            *value = b.count_ones() as f32 * weight;
        }
        mask
    }

    /// Max-combine an 8-bit coverage bitmap whose top-left pixel is at
    /// `(left, top)`.
    pub fn blit(&mut self, left: i32, top: i32, width: usize, height: usize, coverage: &[u8]) {
        for row in 0..height {
            let y = top as i64 + row as i64 - self.y as i64;
            if y < 0 || y >= self.height as i64 {
                continue;
            }
            for col in 0..width {
                let x = left as i64 + col as i64 - self.x as i64;
                if x < 0 || x >= self.width as i64 {
                    continue;
                }
                let Some(&value) = coverage.get(row * width + col) else {
                    continue;
                };
                let idx = y as usize * self.width + x as usize;
                self.data[idx] = self.data[idx].max(value as f32 / 255.0);
            }
        }
    }

    /// Grow coverage outward by `radius` pixels.
    ///
    /// Pixels at least half covered seed an exact Euclidean distance
    /// transform; every other pixel gets the coverage of a disk edge at that
    /// distance, so the cost is linear in the padded area whatever the radius.
    pub fn dilate(&self, radius: f32) -> Mask {
        if !(radius > 0.0) || self.is_empty() {
            return self.clone();
        }

        let pad = radius.ceil() as usize + 1;
        let mut out = self.padded(pad);
        let (width, height) = (out.width, out.height);
        let mut dist: Vec<f64> = out
            .data
            .iter()
            .map(|&c| if c >= 0.5 { 0.0 } else { f64::INFINITY })
            .collect();

        let mut line = Vec::with_capacity(width.max(height));
        let mut result = vec![0.0; width.max(height)];
        let mut sites = Vec::new();
        let mut starts = Vec::new();

        for col in 0..width {
            line.clear();
            line.extend((0..height).map(|row| dist[row * width + col]));
            squared_distance_line(&line, &mut result[..height], &mut sites, &mut starts);
            for row in 0..height {
                dist[row * width + col] = result[row];
            }
        }
        for row in 0..height {
            let span = row * width..(row + 1) * width;
            line.clear();
            line.extend_from_slice(&dist[span.clone()]);
            squared_distance_line(&line, &mut result[..width], &mut sites, &mut starts);
            dist[span].copy_from_slice(&result[..width]);
        }

        let reach = radius as f64 + 1.0;
        for (value, d2) in out.data.iter_mut().zip(&dist) {
            let grown = (reach - d2.sqrt()).clamp(0.0, 1.0) as f32;
            *value = (*value).max(grown);
        }
        out
    }

    /// Approximate gaussian blur with standard deviation `sigma` using three
    /// box passes per axis.
    pub fn blurred(&self, sigma: f32) -> Mask {
        if !(sigma >= 0.5) || self.is_empty() {
            return self.clone();
        }

        let radius = (((4.0 * sigma * sigma + 1.0).sqrt() - 1.0) / 2.0)
            .round()
            .max(1.0) as usize;
        let mut out = self.padded(radius * 3);
        let mut line = Vec::with_capacity(out.width.max(out.height));
        let mut prefix = Vec::with_capacity(out.width.max(out.height) + 1);

        for _ in 0..3 {
            for row in 0..out.height {
                line.clear();
                line.extend_from_slice(&out.data[row * out.width..(row + 1) * out.width]);
                box_blur_line(&line, &mut prefix, radius, |i, v| {
                    out.data[row * out.width + i] = v;
                });
            }
            for col in 0..out.width {
                line.clear();
                line.extend((0..out.height).map(|row| out.data[row * out.width + col]));
                box_blur_line(&line, &mut prefix, radius, |i, v| {
                    out.data[i * out.width + col] = v;
                });
            }
        }
        out
    }

    fn padded(&self, pad: usize) -> Mask {
        let mut out = Mask::new(
            self.x - pad as i32,
            self.y - pad as i32,
            self.width + pad * 2,
            self.height + pad * 2,
        );
        for row in 0..self.height {
            let src = &self.data[row * self.width..(row + 1) * self.width];
            let start = (row + pad) * out.width + pad;
            out.data[start..start + self.width].copy_from_slice(src);
        }
        out
    }
}

/// Edges of a polygon closed back to its first point, as fills treat it.
fn closed_edges(polygon: &Polygon) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = polygon.points.len();
    (0..n).map(move |i| (polygon.points[i], polygon.points[(i + 1) % n]))
}

/// Squared distance from each index to the nearest finite sample of `f`,
/// plus that sample's value, by the lower envelope of parabolas
/// (Felzenszwalb and Huttenlocher). Infinite everywhere when `f` has no
/// finite samples.
fn squared_distance_line(f: &[f64], out: &mut [f64], sites: &mut Vec<usize>, starts: &mut Vec<f64>) {
    sites.clear();
    starts.clear();
    let sq = |i: usize| (i * i) as f64;

    for (q, &fq) in f.iter().enumerate() {
        if !fq.is_finite() {
            continue;
        }
        let mut start = f64::NEG_INFINITY;
        while let (Some(&p), Some(&last)) = (sites.last(), starts.last()) {
            let s = ((fq + sq(q)) - (f[p] + sq(p))) / (2.0 * (q - p) as f64);
            if s > last {
                start = s;
                break;
            }
            sites.pop();
            starts.pop();
        }
        sites.push(q);
        starts.push(start);
    }

    if sites.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, value) in out.iter_mut().enumerate() {
        while k + 1 < sites.len() && starts[k + 1] < q as f64 {
            k += 1;
        }
        let p = sites[k];
        let d = q as f64 - p as f64;
        *value = d * d + f[p];
    }
}

fn box_blur_line(line: &[f32], prefix: &mut Vec<f32>, radius: usize, mut write: impl FnMut(usize, f32)) {
    prefix.clear();
    prefix.push(0.0);
    let mut sum = 0.0;
    for v in line {
        sum += v;
        prefix.push(sum);
    }

    let len = line.len();
    let norm = 1.0 / (2 * radius + 1) as f32;
    for i in 0..len {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius + 1).min(len);
        write(i, (prefix[hi] - prefix[lo]) * norm);
    }
}

/// Alternating on/off run lengths along a stroke.
struct DashPattern {
    runs: Vec<f32>,
    total: f32,
}

impl DashPattern {
    fn new(dash: &[f32]) -> Option<Self> {
        if dash.is_empty() || dash.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return None;
        }
        let mut runs = dash.to_vec();
        if runs.len() % 2 == 1 {
            runs.extend_from_slice(dash);
        }
        let total: f32 = runs.iter().sum();
        if total <= 0.0 {
            return None;
        }
        Some(Self { runs, total })
    }

    fn is_on(&self, position: f32) -> bool {
        let mut p = position.rem_euclid(self.total);
        for (i, run) in self.runs.iter().enumerate() {
            if p < *run {
                return i % 2 == 0;
            }
            p -= run;
        }
        false
    }
}
