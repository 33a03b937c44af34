use super::*;

#[test]
fn derive_seed_is_stable_and_index_sensitive() {
    assert_eq!(derive_seed(42, 0), derive_seed(42, 0));
    assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
    assert_ne!(derive_seed(42, 3), derive_seed(43, 3));
}

#[test]
fn fnv_default_hash_of_nothing_is_offset_basis() {
    assert_eq!(Fnv1a64::new_default().finish(), Fnv1a64::OFFSET_BASIS);
}

#[test]
fn lerp_hits_endpoints() {
    assert_eq!(lerp(8.0, 15.0, 0.0), 8.0);
    assert_eq!(lerp(8.0, 15.0, 1.0), 15.0);
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 128), 128);
    assert_eq!(mul_div255_u16(0, 200), 0);
}
