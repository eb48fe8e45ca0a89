pub fn mult(v: u32, f: f32) -> u32 {
    (v as f32 * f).round() as u32
}
