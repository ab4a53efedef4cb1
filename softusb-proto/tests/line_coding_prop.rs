use proptest::prelude::*;
use softusb_proto::line::{encode, Decoder, LineState, Step, SymbolBuffer, MAX_PACKET_LEN};
use softusb_proto::packet::{encode_data, DataToggle, Packet};

fn decode(symbols: &[LineState]) -> Vec<u8> {
    let mut decoder = Decoder::new();
    for &state in symbols {
        if decoder.feed(state).expect("clean waveform") == Step::Done {
            return decoder.bytes().to_vec();
        }
    }
    panic!("no end of packet");
}

fn longest_run(symbols: &[LineState]) -> usize {
    symbols
        .windows(2)
        .fold((0usize, 0usize), |(run, best), pair| {
            let run = if pair[0] == pair[1] { run + 1 } else { 0 };
            (run, best.max(run))
        })
        .1
}

proptest! {
    #[test]
    fn line_coding_round_trips(bytes in proptest::collection::vec(any::<u8>(), 1..=MAX_PACKET_LEN)) {
        let mut symbols = SymbolBuffer::new();
        encode(&bytes, &mut symbols).unwrap();
        prop_assert_eq!(decode(&symbols), bytes);
    }

    #[test]
    fn stuffing_bounds_runs_of_ones(bytes in proptest::collection::vec(any::<u8>(), 1..=MAX_PACKET_LEN)) {
        let mut symbols = SymbolBuffer::new();
        encode(&bytes, &mut symbols).unwrap();
        let data = &symbols[..symbols.len() - 3];
        // a zero then six ones holds the line for seven states
        prop_assert!(longest_run(data) <= 6);
    }

    #[test]
    fn data_packets_survive_the_wire(
        payload in proptest::collection::vec(any::<u8>(), 0..=8),
        odd in any::<bool>(),
    ) {
        let toggle = if odd { DataToggle::Data1 } else { DataToggle::Data0 };
        let mut buf = [0u8; MAX_PACKET_LEN];
        let n = encode_data(toggle, &payload, &mut buf).unwrap();

        let mut symbols = SymbolBuffer::new();
        encode(&buf[..n], &mut symbols).unwrap();
        let received = decode(&symbols);

        let parsed = Packet::parse(&received).unwrap();
        prop_assert_eq!(parsed, Packet::Data { toggle, payload: &payload });
    }
}
