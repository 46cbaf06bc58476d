use w3d_chunks::{chunk_count, hash_chunk, join, split};

const MAX_CHUNK: usize = 475 * 1024;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn split_ciphertext(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let n = chunk_count(size, MAX_CHUNK).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| split(divan::black_box(&data), n).unwrap().len());
}

#[divan::bench(args = [1024, 65536, 1048576, 10485760])]
fn join_pieces(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    let pieces = split(&data, chunk_count(size, MAX_CHUNK).unwrap()).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| join(divan::black_box(&pieces)));
}

#[divan::bench(args = [1024, 65536, 486400])]
fn keccak_chunk_hash(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| hash_chunk(divan::black_box(&data)));
}

fn main() {
    divan::main();
}
