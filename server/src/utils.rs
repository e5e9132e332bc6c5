use rand::Rng;
use shared::TOKEN_ALPHABET;

// Random token over the unambiguous alphabet; used for lobby codes, player ids and host tokens
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

// Generate tokens until one is not rejected by `taken`
pub fn generate_unique_token<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    taken: impl Fn(&str) -> bool,
) -> String {
    loop {
        let token = generate_token(rng, length);
        if !taken(&token) {
            return token;
        }
    }
}
