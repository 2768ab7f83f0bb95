pub mod materials_seed;
