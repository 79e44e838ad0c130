//! Address-to-zone rule tables for the two mapped municipalities.
//!
//! Rule sets are checked in ascending `priority`. Compound names whose tail
//! is also a pattern in another zone (高城新町 vs 新町, 松原町 vs 原町)
//! and chome-specific rules live in the low-numbered sets.

use crate::core::zones::{MunicipalityTable, RuleSet};
use crate::models::ZoneCode;

const Z1: ZoneCode = ZoneCode::circled(1);
const Z2: ZoneCode = ZoneCode::circled(2);
const Z3: ZoneCode = ZoneCode::circled(3);
const Z4: ZoneCode = ZoneCode::circled(4);
const Z5: ZoneCode = ZoneCode::circled(5);
const Z6: ZoneCode = ZoneCode::circled(6);
const Z7: ZoneCode = ZoneCode::circled(7);
const Z8: ZoneCode = ZoneCode::circled(8);
const Z9: ZoneCode = ZoneCode::circled(9);
const Z10: ZoneCode = ZoneCode::circled(10);
const Z11: ZoneCode = ZoneCode::circled(11);
const Z12: ZoneCode = ZoneCode::circled(12);
const Z13: ZoneCode = ZoneCode::circled(13);
const Z14: ZoneCode = ZoneCode::circled(14);
const Z15: ZoneCode = ZoneCode::circled(15);

/// ㊵ all of Oita city
pub const OITA_CITY_WIDE: ZoneCode = ZoneCode::circled(40);
/// ㊶ all of Beppu city
pub const BEPPU_CITY_WIDE: ZoneCode = ZoneCode::circled(41);

pub const PREFECTURE: &str = "大分県";

pub static OITA: MunicipalityTable = MunicipalityTable {
    name: "oita",
    city_token: "大分市",
    city_wide: OITA_CITY_WIDE,
    chome_districts: &["萩原", "古国府"],
    rule_sets: &[
        RuleSet {
            name: "oita-compound",
            priority: 10,
            rules: &[
                ("高城新町", Z3),
                ("明野高尾", Z4),
                ("大在浜", Z8),
            ],
        },
        RuleSet {
            name: "oita-chome",
            priority: 20,
            rules: &[
                ("萩原1丁目", Z1),
                ("萩原2丁目", Z1),
                ("萩原3丁目", Z3),
                ("萩原4丁目", Z3),
                ("古国府1丁目", Z2),
                ("古国府2丁目", Z2),
                ("古国府3丁目", Z2),
                ("古国府4丁目", Z1),
                ("古国府5丁目", Z1),
                ("古国府6丁目", Z1),
            ],
        },
        RuleSet {
            name: "oita-districts",
            priority: 30,
            rules: &[
                // central
                ("中央町", Z1),
                ("府内町", Z1),
                ("荷揚町", Z1),
                ("都町", Z1),
                ("大手町", Z1),
                ("金池町", Z1),
                ("末広町", Z1),
                ("東春日町", Z1),
                ("新町", Z1),
                ("王子町", Z1),
                ("長浜町", Z1),
                ("勢家町", Z1),
                ("住吉町", Z1),
                ("生石", Z1),
                ("舞鶴町", Z1),
                ("顕徳町", Z1),
                ("西大道", Z1),
                // south
                ("古国府", Z2),
                ("上野丘", Z2),
                ("大道町", Z2),
                ("羽屋", Z2),
                ("南大分", Z2),
                ("片島", Z2),
                // east
                ("萩原", Z3),
                ("東大分", Z3),
                ("下郡", Z3),
                ("森町", Z3),
                ("原川", Z3),
                ("高城", Z3),
                ("日岡", Z3),
                ("花高松", Z3),
                // Akeno
                ("明野", Z4),
                ("城東町", Z4),
                // west
                ("敷戸", Z5),
                ("森岡", Z5),
                ("賀来", Z5),
                ("国分", Z5),
                ("宮崎", Z5),
                // southern hill towns
                ("富士見が丘", Z6),
                ("松が丘", Z6),
                ("青葉台", Z6),
                ("緑が丘", Z6),
                // Wasada
                ("光吉", Z7),
                ("宗方", Z7),
                ("玉沢", Z7),
                ("田尻", Z7),
                ("鴛野", Z7),
                ("木上", Z7),
                ("稙田", Z7),
                // Ozai / Sakanoichi
                ("大在", Z8),
                ("坂ノ市", Z8),
                ("丹川", Z8),
                // Handa / Hetsugi
                ("判田", Z9),
                ("戸次", Z9),
                ("竹中", Z9),
                ("吉野", Z9),
            ],
        },
    ],
};

pub static BEPPU: MunicipalityTable = MunicipalityTable {
    name: "beppu",
    city_token: "別府市",
    city_wide: BEPPU_CITY_WIDE,
    chome_districts: &["石垣東", "石垣西"],
    rule_sets: &[
        RuleSet {
            name: "beppu-compound",
            priority: 10,
            rules: &[
                ("中須賀元町", Z13),
                ("関の江新町", Z13),
                ("松原町", Z10),
            ],
        },
        RuleSet {
            name: "beppu-chome",
            priority: 20,
            rules: &[
                ("石垣東6丁目", Z10),
                ("石垣東7丁目", Z10),
                ("石垣東8丁目", Z10),
                ("石垣東9丁目", Z10),
                ("石垣東10丁目", Z10),
                ("石垣西6丁目", Z10),
                ("石垣西7丁目", Z10),
                ("石垣西8丁目", Z10),
                ("石垣西9丁目", Z10),
                ("石垣西10丁目", Z10),
            ],
        },
        RuleSet {
            name: "beppu-districts",
            priority: 30,
            rules: &[
                // central
                ("北浜", Z10),
                ("北中", Z10),
                ("南町", Z10),
                ("元町", Z10),
                ("楠町", Z10),
                ("中央町", Z10),
                ("駅前", Z10),
                ("秋葉町", Z10),
                ("千代町", Z10),
                ("田の湯町", Z10),
                ("野口中町", Z10),
                ("餅ヶ浜町", Z10),
                // south / Shoen
                ("荘園", Z11),
                ("観海寺", Z11),
                ("朝見", Z11),
                ("浜脇", Z11),
                ("青山町", Z11),
                ("山の手町", Z11),
                ("堀田", Z11),
                ("光町", Z11),
                ("原町", Z11),
                // Ishigaki
                ("石垣", Z12),
                ("中島町", Z12),
                ("上人ヶ浜町", Z12),
                ("上人本町", Z12),
                ("上人仲町", Z12),
                ("桜ケ丘", Z12),
                // Kamegawa
                ("亀川", Z13),
                ("古市町", Z13),
                ("平田町", Z13),
                ("内竈", Z13),
                ("大観山町", Z13),
                ("国立", Z13),
                // Kannawa / Myoban
                ("鉄輪", Z14),
                ("明礬", Z14),
                ("井田", Z14),
                ("火売", Z14),
                ("風呂本", Z14),
                ("御幸", Z14),
                ("小倉", Z14),
                // Ogiyama / hillside
                ("扇山", Z15),
                ("実相寺", Z15),
                ("野田", Z15),
                ("南立石", Z15),
                ("天満町", Z15),
            ],
        },
    ],
};
