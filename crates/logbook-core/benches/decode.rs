use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logbook_core::correlate::Correlator;
use logbook_core::registry::Decoder;
use logbook_core::stream::JournalReader;

#[derive(Clone, Copy, Debug)]
struct BenchmarkTier {
    name: &'static str,
    line_count: usize,
}

const TIERS: [BenchmarkTier; 2] = [
    BenchmarkTier {
        name: "S",
        line_count: 10_000,
    },
    BenchmarkTier {
        name: "M",
        line_count: 100_000,
    },
];

/// Line templates weighted roughly like a combat-and-trade session.
const TEMPLATES: [&str; 10] = [
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"Music","MusicTrack":"Exploration"}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"UnderAttack","Target":"You"}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"UnderAttack","Target":"Fighter"}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"ShipTargeted","TargetLocked":true,"Ship":"python","ScanStage":3,"PilotName":"$npc_name_decorate:#name=Kaylee;","PilotName_Localised":"Kaylee","LegalStatus":"Wanted","Bounty":150000}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"Docked","StationName":"Jameson Memorial","StationType":"Orbis","MarketID":128666762,"StationFaction":{"Name":"Pilots' Federation Local Branch"},"StationGovernment":"$government_Democracy;","StationEconomy":"$economy_HighTech;","StationEconomy_Localised":"","StationEconomies":[{"Name":"$economy_HighTech;","Proportion":0.8},{"Name":"$economy_Industrial;","Proportion":0.2}],"DistFromStarLS":325.2}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"FSDJump","StarSystem":"Shinrarta Dezhra","SystemAddress":3932277478106,"StarPos":[55.71875,17.59375,27.15625],"SystemEconomy":"$economy_HighTech;","SystemGovernment":"$government_Democracy;","SystemSecurity":"$SYSTEM_SECURITY_high;","JumpDist":12.5,"FuelUsed":1.2,"FuelLevel":30.8}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"Scan","ScanType":"Detailed","BodyName":"Sol 3","BodyID":3,"SystemAddress":10477373803,"PlanetClass":"Earthlike body","MassEM":1.0,"TerraformState":"","WasDiscovered":true,"WasMapped":true}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"Market","MarketID":128666762,"StationName":"Jameson Memorial","StarSystem":"Shinrarta Dezhra"}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"CarrierStats","CarrierID":3700000000,"Callsign":"X9X-9XX"}"#,
    r#"{"timestamp":"2023-01-01T09:00:00Z","event":"ReceiveText","From":"$npc_name_decorate:#name=Oliver;","From_Localised":"Oliver","Message":"$Pirate_OnStartScanCargo07;","Message_Localised":"Let's see what you're carrying.","Channel":"npc"}"#,
];

#[derive(Clone, Copy, Debug)]
struct Prng(u64);

impl Prng {
    fn next_index(&mut self, upper_exclusive: usize) -> usize {
        // 64-bit LCG constants from Numerical Recipes.
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as usize % upper_exclusive
    }
}

fn generate_journal(tier: BenchmarkTier, seed: u64) -> String {
    let mut rng = Prng(seed);
    let mut out = String::with_capacity(tier.line_count * 160);
    for _ in 0..tier.line_count {
        out.push_str(TEMPLATES[rng.next_index(TEMPLATES.len())]);
        out.push('\n');
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode.tiered");

    for tier in TIERS {
        let journal = generate_journal(tier, 0x10_6B00_u64 + tier.line_count as u64);
        group.throughput(Throughput::Elements(tier.line_count as u64));

        group.bench_with_input(BenchmarkId::new("decode", tier.name), &journal, |b, journal| {
            b.iter(|| {
                let reader = JournalReader::new(journal.as_bytes(), Decoder::builtin());
                black_box(reader.filter_map(Result::ok).count())
            });
        });

        group.bench_with_input(
            BenchmarkId::new("decode+correlate", tier.name),
            &journal,
            |b, journal| {
                b.iter(|| {
                    let mut correlator = Correlator::new();
                    let reader = JournalReader::new(journal.as_bytes(), Decoder::builtin());
                    for event in reader.filter_map(Result::ok) {
                        black_box(correlator.correlate("bench", event).effect());
                    }
                    correlator.groups("bench").count()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
