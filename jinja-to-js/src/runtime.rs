//! JavaScript helpers injected into compiled templates
//!
//! Generated code calls small helper functions (`__ok`, `__each`,
//! `__escape`, ...) that are copied into the render function the first time
//! they are referenced. Each helper declares the helpers it calls itself so
//! injection can pull those in first.

/// The standalone runtime library (UMD). Compiled templates reference it as
/// `jinjaToJS` for custom filters and, in the global format, for includes.
pub const RUNTIME_SOURCE: &str = include_str!("../runtime/jinja-to-js-runtime.js");

/// A helper function that compiled code may call.
///
/// Declaration order is injection order, so every helper comes after the
/// helpers it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    Type,
    Ok,
    Each,
    Keys,
    IsEqual,
    Contains,
    Escape,
    Capitalize,
    Batch,
    Default,
    Int,
    Slice,
    Title,
    Truncate,
    First,
    Last,
    Size,
}

impl Helper {
    /// The JavaScript function name.
    pub fn name(self) -> &'static str {
        match self {
            Helper::Type => "__type",
            Helper::Ok => "__ok",
            Helper::Each => "__each",
            Helper::Keys => "__keys",
            Helper::IsEqual => "__isEqual",
            Helper::Contains => "__contains",
            Helper::Escape => "__escape",
            Helper::Capitalize => "__capitalize",
            Helper::Batch => "__batch",
            Helper::Default => "__default",
            Helper::Int => "__int",
            Helper::Slice => "__slice",
            Helper::Title => "__title",
            Helper::Truncate => "__truncate",
            Helper::First => "__first",
            Helper::Last => "__last",
            Helper::Size => "__size",
        }
    }

    /// Helpers this one calls.
    pub fn dependencies(self) -> &'static [Helper] {
        match self {
            Helper::Ok | Helper::IsEqual => &[Helper::Type],
            Helper::Contains => &[Helper::Type, Helper::IsEqual],
            _ => &[],
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Helper::Type => TYPE,
            Helper::Ok => OK,
            Helper::Each => EACH,
            Helper::Keys => KEYS,
            Helper::IsEqual => IS_EQUAL,
            Helper::Contains => CONTAINS,
            Helper::Escape => ESCAPE,
            Helper::Capitalize => CAPITALIZE,
            Helper::Batch => BATCH,
            Helper::Default => DEFAULT,
            Helper::Int => INT,
            Helper::Slice => SLICE,
            Helper::Title => TITLE,
            Helper::Truncate => TRUNCATE,
            Helper::First => FIRST,
            Helper::Last => LAST,
            Helper::Size => SIZE,
        }
    }
}

const TYPE: &str = r#"var __toString = Object.prototype.toString;
function __type(o) {
    return __toString.call(o).match(/\[object (.*?)\]/)[1];
}"#;

/// Python truthiness: empty arrays and objects are false.
const OK: &str = r#"function __ok(o) {
    if (!o) {
        return false;
    }
    if (o === true) {
        return o;
    }
    if (Array.isArray(o)) {
        return o.length > 0;
    }
    if (__type(o) === "Object") {
        return Object.keys(o).length > 0;
    }
    return !!o;
}"#;

/// Arrays call back with `(value, index, array)`, objects with
/// `(value, key, keys)`.
const EACH: &str = r#"function __each(obj, fn) {
    if (Array.isArray(obj)) {
        return obj.forEach(fn);
    }
    try {
        var keys = Object.keys(obj);
    } catch (e) {
        return;
    }
    keys.forEach(function (k) {
        fn(obj[k], k, keys);
    });
}"#;

const KEYS: &str = r#"function __keys(obj) {
    if (Array.isArray(obj)) {
        return obj.map(function (_, i) {
            return i;
        });
    }
    try {
        return Object.keys(obj);
    } catch (e) {
        return [];
    }
}"#;

const IS_EQUAL: &str = r#"function __isEqual(objA, objB) {
    var typeA;
    var keysA;
    var i;

    if (objA === objB) {
        return true;
    }

    typeA = __type(objA);

    if (typeA !== __type(objB)) {
        return false;
    }

    if (typeA === "Array") {
        if (objA.length !== objB.length) {
            return false;
        }
        for (i = 0; i < objA.length; i++) {
            if (!__isEqual(objA[i], objB[i])) {
                return false;
            }
        }
        return true;
    }

    if (typeA === "Object") {
        keysA = Object.keys(objA);
        if (keysA.length !== Object.keys(objB).length) {
            return false;
        }
        for (i = 0; i < keysA.length; i++) {
            if (!__isEqual(objA[keysA[i]], objB[keysA[i]])) {
                return false;
            }
        }
        return true;
    }

    return false;
}"#;

/// `item in container` for arrays (deep equality), strings (substring)
/// and objects (own key).
const CONTAINS: &str = r#"function __contains(container, item) {
    var i;
    if (container == null) {
        return false;
    }
    if (Array.isArray(container)) {
        for (i = 0; i < container.length; i++) {
            if (__isEqual(container[i], item)) {
                return true;
            }
        }
        return false;
    }
    if (__type(container) === "String") {
        return container.indexOf(item) !== -1;
    }
    return Object.prototype.hasOwnProperty.call(container, item);
}"#;

const ESCAPE: &str = r#"function __escaper(match) {
    return {
        "&": "&amp;",
        "<": "&lt;",
        ">": "&gt;",
        '"': "&#34;",
        "'": "&#x27;",
        "`": "&#x60;"
    }[match];
}
var __escapeTestRegex = /(?:&|<|>|"|'|`)/;
var __escapeReplaceRegex = new RegExp(__escapeTestRegex.source, "g");
function __escape(str) {
    str = str == null ? "" : "" + str;
    return __escapeTestRegex.test(str) ? str.replace(__escapeReplaceRegex, __escaper) : str;
}"#;

const CAPITALIZE: &str = r#"function __capitalize(s) {
    return s ? s[0].toUpperCase() + s.substring(1) : s;
}"#;

const BATCH: &str = r#"function __batch(arr, size, fillWith) {
    var result = arr.reduce(function (result, value) {
        var curr = result[result.length - 1];
        if (!curr || curr.length === size) {
            result.push([]);
            curr = result[result.length - 1];
        }
        curr.push(value);
        return result;
    }, []);

    var last = result[result.length - 1];
    if (last && last.length < size && fillWith !== undefined) {
        for (var i = last.length; i < size; i++) {
            last.push(fillWith);
        }
    }

    return result;
}"#;

const DEFAULT: &str = r#"function __default(obj, defaultValue, boolean) {
    defaultValue = defaultValue === undefined ? "" : defaultValue;
    boolean = boolean === undefined ? false : boolean;

    var test;

    if (boolean === true) {
        if (!obj) {
            test = false;
        } else if (Array.isArray(obj)) {
            test = obj.length > 0;
        } else {
            try {
                test = Object.keys(obj).length > 0;
            } catch (e) {
                test = !!obj;
            }
        }
    } else {
        test = obj !== undefined;
    }

    return test ? obj : defaultValue;
}"#;

const INT: &str = r#"function __int(value, defaultValue) {
    defaultValue = defaultValue === undefined ? 0 : defaultValue;
    value = parseInt(value, 10);
    return isNaN(value) ? defaultValue : value;
}"#;

/// Splits into `slices` columns; the first `length % slices` columns get one
/// extra item, the others get `fillWith` if given.
const SLICE: &str = r#"function __slice(value, slices, fillWith) {
    var hasFillWith = fillWith != null;
    var length = value.length;
    var itemsPerSlice = Math.floor(length / slices);
    var slicesWithExtra = length % slices;
    var offset = 0;
    var result = [];

    for (var i = 0; i < slices; i++) {
        var start = offset + i * itemsPerSlice;

        if (i < slicesWithExtra) {
            offset += 1;
        }

        var end = offset + (i + 1) * itemsPerSlice;
        var tmp = value.slice(start, end);

        if (hasFillWith && i >= slicesWithExtra) {
            tmp.push(fillWith);
        }

        result.push(tmp);
    }

    return result;
}"#;

const TITLE: &str = r#"function __title(s) {
    s = s + "";
    return s.split(" ").map(function (word) {
        return word ? word[0].toUpperCase() + word.substring(1).toLowerCase() : word;
    }).join(" ");
}"#;

const TRUNCATE: &str = r#"function __truncate(s, length, killwords, end) {
    s = s + "";
    length = length === undefined ? 255 : length;
    killwords = killwords === undefined ? false : killwords;
    end = end === undefined ? "..." : end;

    var endLength = end.length;

    if (s.length <= length) {
        return s;
    } else if (killwords) {
        return s.substring(0, length - endLength) + end;
    }

    s = s.substring(0, length - endLength).split(" ");
    s.pop();
    s = s.join(" ");
    if (s.length < length) {
        s += " ";
    }
    return s + end;
}"#;

const FIRST: &str = r#"function __first(obj) {
    return Array.isArray(obj) ? obj[0] : null;
}"#;

const LAST: &str = r#"function __last(obj) {
    return Array.isArray(obj) ? obj[obj.length - 1] : null;
}"#;

const SIZE: &str = r#"function __size(obj) {
    if (Array.isArray(obj)) {
        return obj.length;
    }
    try {
        var keys = Object.keys(obj);
    } catch (e) {
        return 0;
    }
    return keys.length;
}"#;
