//! Deterministic 2-D noise fields.
//!
//! The rate function only needs something that maps `(x, y)` to `[-1, 1]`
//! reproducibly. [`SimplexNoise`] is the production field; closures implement
//! [`NoiseField2D`] too, which keeps tests free of magic coordinates.

/// A deterministic 2-D scalar field with values in `[-1, 1]`.
pub trait NoiseField2D {
    fn sample(&self, x: f64, y: f64) -> f64;
}

impl<F> NoiseField2D for F
where
    F: Fn(f64, f64) -> f64,
{
    fn sample(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

// Skew/unskew factors for two dimensions: (sqrt(3) - 1) / 2 and (3 - sqrt(3)) / 6.
const F2: f64 = 0.366_025_403_784_438_6;
const G2: f64 = 0.211_324_865_405_187_1;

const GRAD3: [[f64; 2]; 12] = [
    [1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [-1.0, -1.0],
    [1.0, 0.0],
    [-1.0, 0.0],
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
    [0.0, 1.0],
    [0.0, -1.0],
];

/// Seeded simplex noise.
///
/// The permutation table is a Fisher-Yates shuffle of `0..=255` driven by
/// xorshift64*, so a seed fully determines the field on every platform.
#[derive(Clone)]
pub struct SimplexNoise {
    seed: u64,
    perm: [u8; 512],
    perm_mod12: [u8; 512],
}

impl std::fmt::Debug for SimplexNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexNoise")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl SimplexNoise {
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = XorShift64Star::new(seed);
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        for i in (1..table.len()).rev() {
            let j = (rng.next_u64() % (i as u64 + 1)) as usize;
            table.swap(i, j);
        }

        let mut perm = [0u8; 512];
        let mut perm_mod12 = [0u8; 512];
        for i in 0..512 {
            perm[i] = table[i & 255];
            perm_mod12[i] = perm[i] % 12;
        }
        Self {
            seed,
            perm,
            perm_mod12,
        }
    }

    fn corner(&self, gi: usize, x: f64, y: f64) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            return 0.0;
        }
        let g = GRAD3[gi];
        let t2 = t * t;
        t2 * t2 * (g[0] * x + g[1] * y)
    }
}

impl NoiseField2D for SimplexNoise {
    fn sample(&self, xin: f64, yin: f64) -> f64 {
        let s = (xin + yin) * F2;
        let i = (xin + s).floor();
        let j = (yin + s).floor();
        let t = (i + j) * G2;
        let x0 = xin - (i - t);
        let y0 = yin - (j - t);

        // Which of the two triangles of the skewed cell holds the point.
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let ii = (i as i64 & 255) as usize;
        let jj = (j as i64 & 255) as usize;
        let p = &self.perm;
        let gi0 = self.perm_mod12[ii + p[jj] as usize] as usize;
        let gi1 = self.perm_mod12[ii + i1 + p[jj + j1] as usize] as usize;
        let gi2 = self.perm_mod12[ii + 1 + p[jj + 1] as usize] as usize;

        let n = self.corner(gi0, x0, y0) + self.corner(gi1, x1, y1) + self.corner(gi2, x2, y2);
        70.0 * n
    }
}

/// xorshift64* generator. Not for anything security related.
struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    fn new(seed: u64) -> Self {
        // Zero is the xorshift fixed point.
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}
