use once_cell::sync::Lazy;

/// Quadrature rule on the reference triangle.
///
/// Points are barycentric coordinates; weights sum to one and are scaled by
/// the cell area at the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleRule {
    pub degree: usize,
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

/// Gauss–Legendre rule on the unit interval, weights summing to one.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRule {
    pub points: Vec<f64>,
    pub weights: Vec<f64>,
}

impl TriangleRule {
    fn builder(degree: usize) -> Self {
        Self { degree, points: Vec::new(), weights: Vec::new() }
    }

    fn centroid(mut self, w: f64) -> Self {
        self.points.push([1.0 / 3.0; 3]);
        self.weights.push(w);
        self
    }

    // orbit of (a, b, b)
    fn orbit3(mut self, a: f64, w: f64) -> Self {
        let b = 0.5 * (1.0 - a);
        self.points.extend_from_slice(&[[a, b, b], [b, a, b], [b, b, a]]);
        self.weights.extend_from_slice(&[w; 3]);
        self
    }

    // orbit of (a, b, c), all distinct
    fn orbit6(mut self, a: f64, b: f64, w: f64) -> Self {
        let c = 1.0 - a - b;
        self.points
            .extend_from_slice(&[[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]]);
        self.weights.extend_from_slice(&[w; 6]);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f64; 3], f64)> {
        self.points.iter().zip(self.weights.iter().copied())
    }
}

static CENTROID: Lazy<TriangleRule> = Lazy::new(|| TriangleRule::builder(1).centroid(1.0));

static STRANG_FIX_2: Lazy<TriangleRule> =
    Lazy::new(|| TriangleRule::builder(2).orbit3(2.0 / 3.0, 1.0 / 3.0));

// Radon's 7-point rule.
static RADON_5: Lazy<TriangleRule> = Lazy::new(|| {
    TriangleRule::builder(5)
        .centroid(0.225)
        .orbit3(0.059_715_871_789_770, 0.132_394_152_788_506)
        .orbit3(0.797_426_985_353_087, 0.125_939_180_544_827)
});

// Dunavant's 12-point rule.
static DUNAVANT_6: Lazy<TriangleRule> = Lazy::new(|| {
    TriangleRule::builder(6)
        .orbit3(0.501_426_509_658_179, 0.116_786_275_726_379)
        .orbit3(0.873_821_971_016_996, 0.050_844_906_370_207)
        .orbit6(0.053_145_049_844_817, 0.310_352_451_033_784, 0.082_851_075_618_374)
});

static GAUSS_3: Lazy<LineRule> = Lazy::new(|| {
    let d = 0.5 * (3.0f64 / 5.0).sqrt();
    LineRule {
        points: vec![0.5 - d, 0.5, 0.5 + d],
        weights: vec![5.0 / 18.0, 8.0 / 18.0, 5.0 / 18.0],
    }
});

/// Cheapest available rule integrating polynomials of `degree` exactly.
/// Degrees above six fall back to the six-degree rule.
pub fn triangle_rule(degree: usize) -> &'static TriangleRule {
    match degree {
        0 | 1 => &CENTROID,
        2 => &STRANG_FIX_2,
        3..=5 => &RADON_5,
        _ => &DUNAVANT_6,
    }
}

/// Three-point rule on an edge, exact up to degree five.
pub fn line_rule() -> &'static LineRule {
    &GAUSS_3
}
