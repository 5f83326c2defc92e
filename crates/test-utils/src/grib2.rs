//! Synthetic GRIB2 messages (template 3.0 grid, 4.0 product, 5.0 simple
//! packing, 16 bits per value).

/// Builds a single GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    ni: u32,
    nj: u32,
    /// Microdegrees
    la1: i32,
    lo1: i32,
    la2: i32,
    lo2: i32,
    di: u32,
    dj: u32,
    scanning_mode: u8,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    decimal_scale: i16,
    data_values: Vec<f32>,
}

/// GRIB2 sign-magnitude encoding of a 16-bit integer.
fn sm_i16(v: i16) -> [u8; 2] {
    let magnitude = v.unsigned_abs() & 0x7fff;
    let raw = if v < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

fn sm_i32(v: i32) -> [u8; 4] {
    let magnitude = v.unsigned_abs() & 0x7fff_ffff;
    let raw = if v < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

impl Grib2Builder {
    /// NCEP, 10x10 one-degree grid from 45N/130W, 2 m temperature.
    pub fn new_gfs() -> Self {
        let (ni, nj) = (10, 10);
        Self {
            discipline: 0,
            center: 7,
            year: 2025,
            month: 12,
            day: 10,
            hour: 12,
            ni,
            nj,
            la1: 45_000_000,
            lo1: 230_000_000,
            la2: 36_000_000,
            lo2: 239_000_000,
            di: 1_000_000,
            dj: 1_000_000,
            scanning_mode: 0,
            param_category: 0,
            param_number: 0,
            level_type: 103,
            level_value: 2,
            forecast_hour: 0,
            decimal_scale: 0,
            data_values: vec![288.15; (ni * nj) as usize],
        }
    }

    pub fn with_center(mut self, center: u16) -> Self {
        self.center = center;
        self
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    /// Resize the grid keeping the first point and increments.
    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.la2 = self.la1 - (nj as i32 - 1) * self.dj as i32;
        self.lo2 = self.lo1 + (ni as i32 - 1) * self.di as i32;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_decimal_scale(mut self, d: i16) -> Self {
        self.decimal_scale = d;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    pub fn with_gradient(mut self, min_val: f32, max_val: f32) -> Self {
        let n = (self.ni * self.nj) as usize;
        self.data_values = (0..n)
            .map(|i| min_val + (max_val - min_val) * (i as f32 / n as f32))
            .collect();
        self
    }

    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Complete message bytes, `GRIB` through `7777`.
    pub fn build(&self) -> Vec<u8> {
        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(),
            self.build_section6(),
            self.build_section7(),
        ];
        let body: usize = sections.iter().map(Vec::len).sum();
        let message_length = 16 + body + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(&21u32.to_be_bytes());
        s.push(1);
        s.extend_from_slice(&self.center.to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes()); // sub-center
        s.push(2); // master table version
        s.push(1); // local table version
        s.push(1); // start of forecast
        s.extend_from_slice(&self.year.to_be_bytes());
        s.extend_from_slice(&[self.month, self.day, self.hour, 0, 0]);
        s.push(0); // operational
        s.push(1); // forecast
        s
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(&(14u32 + 58).to_be_bytes());
        s.push(3);
        s.push(0);
        s.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        s.push(0);
        s.push(0);
        s.extend_from_slice(&0u16.to_be_bytes()); // template 3.0

        s.push(6); // spherical earth, radius 6371229 m
        s.push(0);
        s.extend_from_slice(&0u32.to_be_bytes());
        s.push(0);
        s.extend_from_slice(&0u32.to_be_bytes());
        s.push(0);
        s.extend_from_slice(&0u32.to_be_bytes());
        s.extend_from_slice(&self.ni.to_be_bytes());
        s.extend_from_slice(&self.nj.to_be_bytes());
        s.extend_from_slice(&0u32.to_be_bytes()); // basic angle
        s.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes()); // subdivisions
        s.extend_from_slice(&sm_i32(self.la1));
        s.extend_from_slice(&sm_i32(self.lo1));
        s.push(48); // resolution and component flags
        s.extend_from_slice(&sm_i32(self.la2));
        s.extend_from_slice(&sm_i32(self.lo2));
        s.extend_from_slice(&self.di.to_be_bytes());
        s.extend_from_slice(&self.dj.to_be_bytes());
        s.push(self.scanning_mode);
        s
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(&34u32.to_be_bytes());
        s.push(4);
        s.extend_from_slice(&0u16.to_be_bytes()); // coordinate values
        s.extend_from_slice(&0u16.to_be_bytes()); // template 4.0
        s.push(self.param_category);
        s.push(self.param_number);
        s.push(2); // forecast
        s.push(0);
        s.push(0);
        s.extend_from_slice(&0u16.to_be_bytes());
        s.push(0);
        s.push(1); // hours
        s.extend_from_slice(&self.forecast_hour.to_be_bytes());
        s.push(self.level_type);
        s.push(0);
        s.extend_from_slice(&self.level_value.to_be_bytes());
        s.push(255);
        s.push(0);
        s.extend_from_slice(&0u32.to_be_bytes());
        s
    }

    /// Reference value, binary scale and bits per value for the data.
    fn packing(&self) -> (f32, i16, u8) {
        let scale = 10f32.powi(self.decimal_scale as i32);
        let (min, max) = self
            .data_values
            .iter()
            .map(|v| v * scale)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        if range == 0.0 {
            (min, 0, 0)
        } else {
            (min, (range / 65535.0).log2().ceil() as i16, 16)
        }
    }

    fn build_section5(&self) -> Vec<u8> {
        let (reference, e, bits) = self.packing();
        let mut s = Vec::new();
        s.extend_from_slice(&21u32.to_be_bytes());
        s.push(5);
        s.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        s.extend_from_slice(&0u16.to_be_bytes()); // template 5.0
        s.extend_from_slice(&reference.to_be_bytes());
        s.extend_from_slice(&sm_i16(e));
        s.extend_from_slice(&sm_i16(self.decimal_scale));
        s.push(bits);
        s.push(0); // floating point
        s
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut s = Vec::new();
        s.extend_from_slice(&6u32.to_be_bytes());
        s.push(6);
        s.push(255); // no bitmap
        s
    }

    fn build_section7(&self) -> Vec<u8> {
        let (reference, e, bits) = self.packing();
        let mut packed = Vec::new();
        if bits > 0 {
            let scale = 10f32.powi(self.decimal_scale as i32);
            let binary = 2f32.powi(e as i32);
            for &v in &self.data_values {
                let x = ((v * scale - reference) / binary).round() as u16;
                packed.extend_from_slice(&x.to_be_bytes());
            }
        }
        let mut s = Vec::new();
        s.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
        s.push(7);
        s.extend_from_slice(&packed);
        s
    }
}

/// Concatenate messages into one file body.
pub fn grib2_file(messages: &[Grib2Builder]) -> Vec<u8> {
    messages.iter().flat_map(|m| m.build()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_gfs_message() {
        let data = Grib2Builder::new_gfs().build();
        assert_eq!(&data[0..4], b"GRIB");
        assert_eq!(data[7], 2);
        assert_eq!(data[6], 0);
        assert_eq!(&data[data.len() - 4..], b"7777");
        let declared = u64::from_be_bytes(data[8..16].try_into().unwrap());
        assert_eq!(declared as usize, data.len());
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(sm_i16(-10), [0x80, 0x0a]);
        assert_eq!(sm_i16(3), [0x00, 0x03]);
        assert_eq!(sm_i32(-1), [0x80, 0, 0, 1]);
    }

    #[test]
    fn test_with_grid_moves_last_point() {
        let b = Grib2Builder::new_gfs().with_grid(4, 3);
        assert_eq!(b.la2, 43_000_000);
        assert_eq!(b.lo2, 233_000_000);
    }
}
