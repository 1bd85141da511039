//! Earlier blueprint layout.
//!
//! Lines of this era are right-trimmed on output, so the widths below are
//! upper bounds. The SPU record repeats the agreement number and the REC
//! record carries title, duration and a two-letter source flag.

use super::{FieldSpec as F, RecordSpec};

pub static RECORDS: &[RecordSpec] = &[
    RecordSpec {
        tag: "HDR",
        width: 108,
        fields: &[
            F::constant("HDR", 0, 3),
            F::constant("01", 3, 2),
            F::numeric("sender_ipi", 5, 9),
            F::alpha("sender_name", 14, 45),
            F::constant("01.10", 61, 5),
            F::numeric("creation_date", 66, 8),
            F::numeric("creation_time", 74, 6),
            F::numeric("transmission_date", 80, 8),
            F::constant("2.2", 103, 3),
            F::constant("00", 106, 2),
        ],
    },
    RecordSpec {
        tag: "GRH",
        width: 26,
        fields: &[
            F::constant("GRH", 0, 3),
            F::constant("NWR", 3, 3),
            F::constant("00001", 6, 5),
            F::constant("02.20", 11, 5),
            F::constant("0000000000", 16, 10),
        ],
    },
    RecordSpec {
        tag: "NWR",
        width: 145,
        fields: &[
            F::constant("NWR", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::constant("00000000", 11, 8),
            F::alpha("title", 19, 60),
            F::alpha("work_id", 81, 14),
            F::alpha("iswc", 95, 11),
            F::constant("00000000", 106, 8),
            F::constant("UNC", 126, 3),
            F::numeric("duration", 129, 6),
            F::constant("Y", 135, 1),
            F::constant("ORI", 142, 3),
        ],
    },
    RecordSpec {
        tag: "SPU",
        width: 184,
        fields: &[
            F::constant("SPU", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::numeric("chain_id", 19, 2),
            F::alpha("pub_id", 21, 9),
            F::alpha("pub_name", 30, 45),
            F::alpha("role", 76, 2),
            F::alpha("ipi", 87, 11),
            F::alpha("pr_soc", 112, 3),
            F::numeric("pr_share", 115, 5),
            F::alpha("mr_soc", 120, 3),
            F::numeric("mr_share", 123, 5),
            F::alpha("sr_soc", 128, 3),
            F::numeric("sr_share", 131, 5),
            F::constant("N", 137, 1),
            F::alpha("agreement", 145, 14),
            F::alpha("agreement", 165, 14),
            F::constant("PG", 179, 2),
        ],
    },
    RecordSpec {
        tag: "SPT",
        width: 58,
        fields: &[
            F::constant("SPT", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::alpha("pub_id", 19, 9),
            F::numeric("pr_share", 34, 5),
            F::numeric("mr_share", 39, 5),
            F::numeric("sr_share", 44, 5),
            F::constant("I", 49, 1),
            F::alpha("territory", 50, 4),
            F::constant("001", 55, 3),
        ],
    },
    RecordSpec {
        tag: "SWR",
        width: 152,
        fields: &[
            F::constant("SWR", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::alpha("writer_id", 19, 9),
            F::alpha("last_name", 28, 45),
            F::alpha("first_name", 73, 30),
            F::constant("C", 104, 2),
            F::alpha("ipi", 115, 11),
            F::alpha("pr_soc", 126, 3),
            F::numeric("pr_share", 129, 5),
            F::alpha("mr_soc", 134, 3),
            F::numeric("mr_share", 137, 5),
            F::alpha("sr_soc", 142, 3),
            F::numeric("sr_share", 145, 5),
            F::constant("N", 151, 1),
        ],
    },
    RecordSpec {
        tag: "SWT",
        width: 52,
        fields: &[
            F::constant("SWT", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::alpha("writer_id", 19, 9),
            F::numeric("pr_share", 28, 5),
            F::numeric("mr_share", 33, 5),
            F::numeric("sr_share", 38, 5),
            F::constant("I", 43, 1),
            F::constant("2136", 44, 4),
            F::constant("001", 49, 3),
        ],
    },
    RecordSpec {
        tag: "PWR",
        width: 112,
        fields: &[
            F::constant("PWR", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::alpha("pub_id", 19, 9),
            F::alpha("pub_name", 28, 45),
            F::alpha("agreement", 73, 14),
            F::alpha("writer_id", 101, 9),
            F::numeric("chain_id", 110, 2),
        ],
    },
    RecordSpec {
        tag: "REC",
        width: 350,
        fields: &[
            F::constant("REC", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::constant("00000000", 19, 8),
            F::numeric("duration", 74, 6),
            F::alpha("cd_id", 154, 14),
            F::alpha("isrc", 180, 12),
            F::alpha("source", 194, 2),
            F::alpha("title", 197, 60),
            // Narrowed to stop short of the flag at 349.
            F::alpha("label", 297, 52),
            F::constant("Y", 349, 1),
        ],
    },
    RecordSpec {
        tag: "ORN",
        width: 160,
        fields: &[
            F::constant("ORN", 0, 3),
            F::numeric("t_seq", 3, 8),
            F::numeric("rec_seq", 11, 8),
            F::constant("LIB", 19, 3),
            F::alpha("library", 22, 60),
            F::alpha("cd_id", 82, 14),
            F::numeric("cut_number", 96, 4),
            F::alpha("label", 100, 60),
        ],
    },
    RecordSpec {
        tag: "GRT",
        width: 24,
        fields: &[
            F::constant("GRT", 0, 3),
            F::constant("00001", 3, 5),
            F::numeric("t_count", 8, 8),
            F::numeric("r_count", 16, 8),
        ],
    },
    RecordSpec {
        tag: "TRL",
        width: 24,
        fields: &[
            F::constant("TRL", 0, 3),
            F::constant("00001", 3, 5),
            F::numeric("t_count", 8, 8),
            F::numeric("r_count", 16, 8),
        ],
    },
];
