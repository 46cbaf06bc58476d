use w3d_crypto::{decrypt, derive_file_key, encrypt, DriveKey};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let drive_key = DriveKey::from_bytes([0xABu8; 32]);
    let file_key = derive_file_key(&drive_key, "bench-file").unwrap();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(divan::black_box(&file_key), divan::black_box(&data)).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let drive_key = DriveKey::from_bytes([0xABu8; 32]);
    let file_key = derive_file_key(&drive_key, "bench-file").unwrap();
    let data = make_data(size);
    let sealed = encrypt(&file_key, &data).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt(
                divan::black_box(&file_key),
                divan::black_box(&sealed.iv),
                divan::black_box(&sealed.ciphertext),
            )
            .unwrap()
        });
}

#[divan::bench]
fn bench_derive_file_key(bencher: divan::Bencher) {
    let drive_key = DriveKey::from_bytes([0xABu8; 32]);
    bencher.bench(|| derive_file_key(divan::black_box(&drive_key), "bench-file").unwrap());
}

fn main() {
    divan::main();
}
