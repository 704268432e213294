//! Signal-strength dependent error.
//!
//! Measured ranging error is heavy tailed and its offset and spread grow as
//! receive power drops. Each calibrated power level carries a fitted Johnson SU
//! distribution, sampled by inverse transform with an approximate inverse
//! normal CDF.

use rand_distr::{Distribution, Uniform};

use super::wireless::WirelessErrorModel;
use super::{ErrorContext, ErrorModel};

/// Parameters of a Johnson SU distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JohnsonSu {
    /// Shape gamma.
    pub gamma: f64,
    /// Shape delta.
    pub delta: f64,
    /// Location xi.
    pub xi: f64,
    /// Scale lambda.
    pub lambda: f64,
}

impl JohnsonSu {
    /// Value of the distribution at standard normal quantile `z`.
    pub fn transform(&self, z: f64) -> f64 {
        self.lambda * ((z - self.gamma) / self.delta).sinh() + self.xi
    }
}

/// Calibrated distributions by receive power in dBm, strongest first.
pub const JOHNSON_SU_TABLE: [(i32, JohnsonSu); 17] = [
    (-34, su(3.185354317604147, 5.478262165530669, 6607.306595955903, 10570.049082397905)),
    (-54, su(5.244677635165819, 6.7849632493308984, 11337.621653529686, 13422.49177763342)),
    (-57, su(11.526219535401548, 11.752569979080313, 23972.68246527834, 21157.45764517224)),
    (-60, su(2.9557921354424597, 5.964536004213013, 7871.392874146462, 16622.55659360096)),
    (-63, su(6.531332615907574, 9.919020162635562, 20472.998112906615, 30324.20728528186)),
    (-66, su(1.5679223209733015, 2.651102194031285, 6467.335055986082, 10780.685947891918)),
    (-69, su(1.1919025159806425, 1.7569740011989712, 5315.277549936767, 9231.043791364496)),
    (-72, su(1.6836266134414828, 1.5382463243606552, 9816.63892830534, 9491.487540612658)),
    (-74, su(4.689858735589265, 1.9587337465051236, 28439.426802970185, 6570.588773099477)),
    (-75, su(5.456350713475308, 1.9477684103673694, 30054.10998533451, 4864.245629274696)),
    (-76, su(7.139744646153247, 2.1710686890594744, 38988.747394210804, 3882.820051622388)),
    (-77, su(8.262140730541272, 2.1345127965798465, 42133.22288891718, 2389.29904971697)),
    (-78, su(8.522080144367578, 2.687266469105907, 64794.77378244052, 7235.395990126872)),
    (-79, su(9.641640107814577, 3.0128025233396336, 81275.30052138754, 8765.970931713084)),
    (-80, su(10.561011243252771, 3.34567183184721, 99724.65034040553, 11258.496064080893)),
    (-81, su(15.27327368062722, 5.383312465271288, 190229.12414263037, 27177.723635919916)),
    (-82, su(21.623359857149143, 7.2130572012096055, 282943.14579305204, 33155.660042021365)),
];

const fn su(gamma: f64, delta: f64, xi: f64, lambda: f64) -> JohnsonSu {
    JohnsonSu {
        gamma,
        delta,
        xi,
        lambda,
    }
}

/// Closest calibrated power level to `dbm` and its distribution.
///
/// `dbm` is rounded to whole dBm first. On a tie the stronger level wins.
pub fn closest_signal_strength(dbm: f64) -> (i32, &'static JohnsonSu) {
    let target = dbm.round() as i64;
    let mut best = &JOHNSON_SU_TABLE[0];
    for entry in &JOHNSON_SU_TABLE[1..] {
        if (target - i64::from(entry.0)).abs() < (target - i64::from(best.0)).abs() {
            best = entry;
        }
    }
    (best.0, &best.1)
}

/// Inverse of the standard normal CDF.
///
/// Abramowitz and Stegun formula 26.2.23, absolute error below 4.5e-4.
///
/// # Panics
///
/// Panics unless `0 < p < 1`.
pub fn normal_cdf_inverse(p: f64) -> f64 {
    assert!(
        p > 0.0 && p < 1.0,
        "invalid input to inverse normal CDF ({p}); must be larger than 0 and less than 1"
    );
    if p < 0.5 {
        -rational_approximation((-2.0 * p.ln()).sqrt())
    } else {
        rational_approximation((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

fn rational_approximation(t: f64) -> f64 {
    const C: [f64; 3] = [2.515517, 0.802853, 0.010328];
    const D: [f64; 3] = [1.432788, 0.189269, 0.001308];
    t - ((C[2] * t + C[1]) * t + C[0]) / (((D[2] * t + D[1]) * t + D[0]) * t + 1.0)
}

/// Wireless error plus Johnson SU noise chosen by receive power.
///
/// Without a signal strength in the context only the wireless part is
/// applied. Uniform draws share the wired model's generator, so one seed
/// fixes the whole sequence.
pub struct SignalStrengthErrorModel {
    wireless: WirelessErrorModel,
    uniform: Uniform<f64>,
}

impl SignalStrengthErrorModel {
    /// Layer signal-strength noise over `wireless`.
    pub fn new(wireless: WirelessErrorModel) -> Self {
        Self {
            wireless,
            uniform: Uniform::new(0.0, 1.0),
        }
    }

    /// Underlying wireless model.
    pub fn wireless_mut(&mut self) -> &mut WirelessErrorModel {
        &mut self.wireless
    }

    fn johnson_error(&mut self, dbm: f64) -> i64 {
        let (_, params) = closest_signal_strength(dbm);
        let rng = self.wireless.wired_mut().rng_mut();
        let mut u = self.uniform.sample(rng);
        while u == 0.0 {
            u = self.uniform.sample(rng);
        }
        params.transform(normal_cdf_inverse(u)).round() as i64
    }
}

impl ErrorModel for SignalStrengthErrorModel {
    fn sample(&mut self, ctx: &ErrorContext) -> i64 {
        let johnson = match ctx.signal_strength {
            Some(dbm) => self.johnson_error(dbm),
            None => 0,
        };
        johnson + self.wireless.sample(ctx)
    }
}
